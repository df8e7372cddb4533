//! End-to-end tests for the troubleshooter

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use copilot_sdk::error::ServiceError;
    use tokio_util::sync::CancellationToken;

    use crate::config::PipelineConfig;
    use crate::error::FixError;
    use crate::log_source::StaticLogSource;
    use crate::pipeline::{SourceBinding, Troubleshooter};
    use crate::sink::BufferSink;
    use crate::tests::support::{
        issue, post, MockSearchBackend, ScriptedModel, ANSWER_MARKER, PATTERNS_MARKER, REPHRASE_MARKER,
        RERANK_MARKER, SUMMARY_MARKER, USAGE_PER_CALL,
    };
    use crate::types::{ConversationTurn, ErrorContext, FixRequest};

    const REPO: &str = "OfficeDev/teams-toolkit";
    const ISSUE_URL: &str = "https://github.com/OfficeDev/teams-toolkit/issues/11520";

    fn missing_env_request() -> FixRequest {
        let context = ErrorContext {
            error_code: "teamsApp.MissingEnv".to_string(),
            message: "Environment variables are missing: TEAMS_APP_ID".to_string(),
            stack: String::new(),
            help_link: "https://aka.ms/teamsfx-env".to_string(),
        };
        FixRequest::new(serde_json::to_string(&context).unwrap())
    }

    fn scenario_model() -> ScriptedModel {
        ScriptedModel::new()
            .reply_when(
                &[PATTERNS_MARKER],
                r#"{"errorCode": "teamsApp.MissingEnv", "searchPatterns": ["teamsApp.MissingEnv"]}"#,
            )
            .reply_when(&[RERANK_MARKER], "2")
            .reply_when(&[SUMMARY_MARKER], "Define TEAMS_APP_ID in env/.env.dev and provision again.")
            .reply_when(&[ANSWER_MARKER], "Add TEAMS_APP_ID to env/.env.dev, then run provision.")
    }

    fn log() -> Arc<StaticLogSource> {
        Arc::new(StaticLogSource::new(
            "[info] provisioning\n[error] [teamsApp.MissingEnv] Environment variables are missing",
        ))
    }

    fn issue_backend() -> MockSearchBackend {
        let mut backend = MockSearchBackend::new();
        backend
            .expect_retrieve()
            .times(1)
            .returning(|repository, query| {
                assert_eq!(repository, REPO);
                assert_eq!(query, "teamsApp.MissingEnv");
                Ok(vec![issue(ISSUE_URL, "teamsApp.MissingEnv on provision")])
            });
        backend
    }

    #[tokio::test]
    async fn test_missing_env_scenario() {
        let model = Arc::new(scenario_model());
        let troubleshooter = Troubleshooter::new(model.clone(), log(), PipelineConfig::default())
            .with_source(SourceBinding::new(Arc::new(issue_backend()), REPO));
        let sink = BufferSink::new();

        let report = troubleshooter
            .run(&missing_env_request(), &sink, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.error_context.error_code, "teamsApp.MissingEnv");
        assert_eq!(report.search_plan.search_patterns, vec!["teamsApp.MissingEnv"]);
        assert_eq!(report.candidates, 1);
        assert_eq!(report.retained.len(), 1);
        assert_eq!(report.retained[0].score, 2);
        assert_eq!(report.retained[0].result.url(), ISSUE_URL);
        assert_eq!(report.summaries.len(), 1);
        assert!(report.source_failures.is_empty());
        assert!(report.error.is_none());

        // structured query: no context extraction, no history: no rephrase
        assert_eq!(model.calls(), 4);
        assert!(model.prompts_with(REPHRASE_MARKER).is_empty());

        let answer_prompts = model.prompts_with(ANSWER_MARKER);
        assert_eq!(answer_prompts.len(), 1);
        assert!(answer_prompts[0].contains("\"teamsApp.MissingEnv\""));
        assert!(answer_prompts[0].contains("Define TEAMS_APP_ID in env/.env.dev"));
        assert!(answer_prompts[0].contains("[error] [teamsApp.MissingEnv]"));

        assert_eq!(report.answer, "Add TEAMS_APP_ID to env/.env.dev, then run provision.");
        assert_eq!(sink.text(), report.answer);

        assert_eq!(
            sink.progress_messages(),
            vec![
                "Retrieving error context...",
                "Retrieving output log...",
                "Rephrasing query...",
                "Extracting search patterns...",
                "Retrieving search results...",
                "Reranking search results...",
                "Summarizing search results...",
                "Generating response...",
            ]
        );

        assert_eq!(report.usage.prompt_tokens, 4 * USAGE_PER_CALL.prompt_tokens);
        assert_eq!(report.usage.completion_tokens, 4 * USAGE_PER_CALL.completion_tokens);
    }

    #[tokio::test]
    async fn test_history_triggers_rephrase() {
        let model = Arc::new(
            scenario_model()
                .reply_when(&[REPHRASE_MARKER], "How do I fix teamsApp.MissingEnv during provision?")
                .default_reply("{}"),
        );
        let troubleshooter = Troubleshooter::new(model.clone(), log(), PipelineConfig::default());
        let request = FixRequest::new("it still fails").with_history(vec![
            ConversationTurn::Request("provision fails".to_string()),
            ConversationTurn::Response("Which error do you see?".to_string()),
        ]);

        let report = troubleshooter
            .run(&request, &BufferSink::new(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.rephrased_query, "How do I fix teamsApp.MissingEnv during provision?");
        assert!(report.error_context.is_empty());
        assert!(model.prompts_with(ANSWER_MARKER)[0].contains("How do I fix teamsApp.MissingEnv during provision?"));
    }

    #[tokio::test]
    async fn test_empty_plan_skips_retrieval() {
        let model = Arc::new(
            ScriptedModel::new()
                .reply_when(&[PATTERNS_MARKER], r#"{"errorCode": "", "searchPatterns": []}"#)
                .reply_when(&[ANSWER_MARKER], "Please share the error message."),
        );
        let mut backend = MockSearchBackend::new();
        backend.expect_retrieve().times(0);

        let troubleshooter = Troubleshooter::new(model.clone(), log(), PipelineConfig::default())
            .with_source(SourceBinding::new(Arc::new(backend), REPO));

        let report = troubleshooter
            .run(&missing_env_request(), &BufferSink::new(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.candidates, 0);
        assert!(report.summaries.is_empty());
        assert_eq!(report.answer, "Please share the error message.");
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn test_null_error_code_still_searches() {
        let model = Arc::new(
            ScriptedModel::new()
                .reply_when(
                    &[PATTERNS_MARKER],
                    r#"{"errorCode": null, "searchPatterns": ["teamsApp.MissingEnv"]}"#,
                )
                .reply_when(&[RERANK_MARKER], "2")
                .reply_when(&[SUMMARY_MARKER], "Define TEAMS_APP_ID.")
                .reply_when(&[ANSWER_MARKER], "Add TEAMS_APP_ID to env/.env.dev."),
        );
        let troubleshooter = Troubleshooter::new(model, log(), PipelineConfig::default())
            .with_source(SourceBinding::new(Arc::new(issue_backend()), REPO));

        let report = troubleshooter
            .run(&missing_env_request(), &BufferSink::new(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.search_plan.error_code, "");
        assert_eq!(report.search_plan.search_patterns, vec!["teamsApp.MissingEnv"]);
        assert_eq!(report.candidates, 1);
    }

    #[tokio::test]
    async fn test_failing_source_is_reported_not_fatal() {
        let mut broken = MockSearchBackend::new();
        broken
            .expect_retrieve()
            .times(1)
            .returning(|_, _| Err(ServiceError::network("connection refused")));

        let mut posts = MockSearchBackend::new();
        posts
            .expect_retrieve()
            .times(1)
            .returning(|_, _| Ok(vec![post("https://stackoverflow.com/q/77", "Missing env")]));

        let model = Arc::new(scenario_model());
        let troubleshooter = Troubleshooter::new(model, log(), PipelineConfig::default())
            .with_source(SourceBinding::new(Arc::new(broken), REPO))
            .with_source(SourceBinding::new(Arc::new(posts), REPO));

        let report = troubleshooter
            .run(&missing_env_request(), &BufferSink::new(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.source_failures.len(), 1);
        assert_eq!(report.source_failures[0].query, "teamsApp.MissingEnv");
        assert!(report.source_failures[0].error.contains("connection refused"));
        assert_eq!(report.retained.len(), 1);
        assert_eq!(report.retained[0].result.url(), "https://stackoverflow.com/q/77");
        assert!(!report.answer.is_empty());
    }

    #[tokio::test]
    async fn test_sources_merge_in_binding_order_with_limits() {
        let mut first = MockSearchBackend::new();
        first.expect_retrieve().returning(|_, _| {
            Ok(vec![
                issue("https://github.com/o/r/issues/1", "one"),
                issue("https://github.com/o/r/issues/2", "two"),
            ])
        });
        let mut second = MockSearchBackend::new();
        second
            .expect_retrieve()
            .returning(|_, _| Ok(vec![post("https://stackoverflow.com/q/3", "three")]));

        let model = Arc::new(scenario_model());
        let troubleshooter = Troubleshooter::new(model, log(), PipelineConfig::default())
            .with_source(SourceBinding::new(Arc::new(first), REPO).with_limit(Some(1)))
            .with_source(SourceBinding::new(Arc::new(second), REPO));

        let report = troubleshooter
            .run(&missing_env_request(), &BufferSink::new(), CancellationToken::new())
            .await
            .unwrap();

        let urls: Vec<&str> = report.retained.iter().map(|s| s.result.url()).collect();
        assert_eq!(urls, vec!["https://github.com/o/r/issues/1", "https://stackoverflow.com/q/3"]);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_does_nothing() {
        let model = Arc::new(scenario_model());
        let troubleshooter = Troubleshooter::new(model.clone(), log(), PipelineConfig::default());
        let sink = BufferSink::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = troubleshooter.run(&missing_env_request(), &sink, cancel).await.unwrap_err();

        assert!(matches!(err, FixError::Cancelled));
        assert_eq!(model.calls(), 0);
        assert!(sink.progress_messages().is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_aborts_in_flight_model_call() {
        let model = Arc::new(scenario_model().with_delay(Duration::from_secs(30)));
        let troubleshooter = Troubleshooter::new(model, log(), PipelineConfig::default());
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let sink = BufferSink::new();
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            troubleshooter.run(&missing_env_request(), &sink, cancel),
        )
        .await
        .expect("cancellation should end the request promptly");

        assert!(matches!(result, Err(FixError::Cancelled)));
        assert!(sink.text().is_empty());
    }

    #[tokio::test]
    async fn test_handle_reports_failure_to_sink() {
        let model = Arc::new(ScriptedModel::new().fail_when(&[PATTERNS_MARKER], "invalid api key"));
        let troubleshooter = Troubleshooter::new(model, log(), PipelineConfig::default());
        let sink = BufferSink::new();

        let report = troubleshooter
            .handle(&missing_env_request(), &sink, CancellationToken::new())
            .await;

        let error = report.error.unwrap();
        assert!(error.contains("invalid api key"));
        assert!(sink.text().contains("couldn't finish troubleshooting"));
        assert!(sink.text().contains("invalid api key"));
        assert!(report.answer.is_empty());
    }

    #[tokio::test]
    async fn test_atomic_mode_forwards_answer_once() {
        let model = Arc::new(scenario_model());
        let config = PipelineConfig {
            streaming: false,
            ..PipelineConfig::default()
        };
        let troubleshooter = Troubleshooter::new(model, log(), config)
            .with_source(SourceBinding::new(Arc::new(issue_backend()), REPO));
        let sink = BufferSink::new();

        let report = troubleshooter
            .run(&missing_env_request(), &sink, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(sink.fragments(), vec![report.answer.clone()]);
    }
}

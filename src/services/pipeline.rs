use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::core::catalog::SUGGEST_CHAPTER_TITLES;
use crate::core::document::{ChapterList, DocumentConfiguration};
use crate::core::error::{GenerationError, ValidationError};
use crate::core::state::{GenerationResult, Source};
use crate::services::llm::{GenerationRequest, LlmClient};
use crate::services::prompt::compose_prompt;
use crate::services::retry::RetryPolicy;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PipelineOutcome {
    Document(GenerationResult),
    /// Candidate names returned for the title-suggestion entry. Never recorded in history.
    ChapterTitleSuggestions(Vec<String>),
}

/// Reported before each chapter call. `index` is zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineProgress<'a> {
    pub index: usize,
    pub total: usize,
    pub chapter: &'a str,
}

type ProgressCallback = Box<dyn Fn(PipelineProgress<'_>)>;

/// Running state of a generation run. Each finished chapter produces a new
/// accumulator from the previous one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Accumulator {
    pub text: String,
    pub sources: Vec<Source>,
    /// Delimited raw text of every chapter so far, fed into the next prompt.
    pub context: String,
}

impl Accumulator {
    pub fn append(self, chapter: &str, result: GenerationResult) -> Self {
        let Accumulator {
            mut text,
            mut sources,
            mut context,
        } = self;

        text.push_str(&format!("\n\n# {}\n\n{}", chapter, result.text));
        context.push_str(&format!(
            "\n\n--- AWAL DARI: {chapter} ---\n\n{}\n\n--- AKHIR DARI: {chapter} ---\n\n",
            result.text
        ));
        sources.extend(result.sources);

        Accumulator {
            text,
            sources,
            context,
        }
    }

    pub fn finish(self) -> GenerationResult {
        GenerationResult {
            text: self.text.trim().to_string(),
            sources: self.sources,
        }
    }
}

/// Generates the selected chapters one after another, each prompt carrying
/// the text of the chapters before it.
pub struct Pipeline {
    llm: Box<dyn LlmClient>,
    retry: RetryPolicy,
    cancel: Option<CancellationToken>,
    progress: Option<ProgressCallback>,
}

impl Pipeline {
    pub fn new(llm: Box<dyn LlmClient>, retry: RetryPolicy) -> Self {
        Self {
            llm,
            retry,
            cancel: None,
            progress: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_progress(mut self, callback: impl Fn(PipelineProgress<'_>) + 'static) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// `chapters` gives the display order; the selection in `config` is
    /// generated in that order regardless of the order it was picked in.
    pub async fn run(
        &self,
        config: &DocumentConfiguration,
        chapters: &ChapterList,
    ) -> Result<PipelineOutcome, GenerationError> {
        config.validate()?;

        if config.is_suggestion_request() {
            return self.suggest_chapter_titles(config).await;
        }

        let ordered = chapters.ordered_selection(&config.selected_chapters);
        for missing in config
            .selected_chapters
            .iter()
            .filter(|c| !ordered.contains(c))
        {
            log::warn!("Selected chapter \"{}\" is not in the chapter list, skipping", missing);
        }
        if ordered.is_empty() {
            return Err(ValidationError::NoChapters.into());
        }

        let grounding = config.wants_grounding();
        let total = ordered.len();
        let mut acc = Accumulator::default();

        for (index, chapter) in ordered.iter().enumerate() {
            if let Some(progress) = &self.progress {
                progress(PipelineProgress {
                    index,
                    total,
                    chapter,
                });
            }
            log::info!("Generating chapter {}/{}: {}", index + 1, total, chapter);

            let prompt = compose_prompt(config, chapter, &acc.context);
            log::debug!("Prompt for \"{}\": {} chars", chapter, prompt.chars().count());
            let request = GenerationRequest::chapter(prompt, grounding);

            let label = format!("membuat bab \"{}\"", chapter);
            let result = self
                .retry
                .run(&label, self.cancel.as_ref(), || self.llm.generate(&request))
                .await?;

            log::info!(
                "Finished chapter \"{}\" ({} chars, {} sources)",
                chapter,
                result.text.chars().count(),
                result.sources.len()
            );
            acc = acc.append(chapter, result);
        }

        Ok(PipelineOutcome::Document(acc.finish()))
    }

    async fn suggest_chapter_titles(
        &self,
        config: &DocumentConfiguration,
    ) -> Result<PipelineOutcome, GenerationError> {
        let prompt = compose_prompt(config, SUGGEST_CHAPTER_TITLES, "");
        let request = GenerationRequest::utility(prompt);
        let result = self
            .retry
            .run("menyarankan judul bab", self.cancel.as_ref(), || {
                self.llm.generate(&request)
            })
            .await?;

        let titles = parse_numbered_titles(&result.text);
        log::info!("Received {} chapter title suggestions", titles.len());
        Ok(PipelineOutcome::ChapterTitleSuggestions(titles))
    }
}

/// Splits a numbered list into its entries, dropping `1.` style markers and blank lines.
pub fn parse_numbered_titles(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| strip_ordinal(line.trim()).trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

fn strip_ordinal(line: &str) -> &str {
    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return line;
    }
    match line[digits..].strip_prefix('.') {
        Some(rest) => rest,
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::document::{DocumentKind, DocumentMode};
    use crate::core::error::RemoteError;
    use crate::services::llm::ModelTier;
    use async_trait::async_trait;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    type Script = VecDeque<Result<GenerationResult, RemoteError>>;

    #[derive(Debug, Default)]
    struct MockLlmClient {
        requests: Arc<Mutex<Vec<GenerationRequest>>>,
        responses: Arc<Mutex<Script>>,
    }

    impl MockLlmClient {
        fn scripted(responses: Vec<Result<GenerationResult, RemoteError>>) -> Self {
            Self {
                requests: Arc::new(Mutex::new(Vec::new())),
                responses: Arc::new(Mutex::new(responses.into())),
            }
        }

        fn texts(texts: &[&str]) -> Self {
            Self::scripted(texts.iter().map(|t| Ok(GenerationResult::text(*t))).collect())
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult, RemoteError> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(RemoteError::permanent("no scripted response")))
        }
    }

    fn pipeline(mock: MockLlmClient) -> (Pipeline, Arc<Mutex<Vec<GenerationRequest>>>) {
        let requests = mock.requests.clone();
        (Pipeline::new(Box::new(mock), RetryPolicy::default()), requests)
    }

    fn config_with(selected: &[&str]) -> DocumentConfiguration {
        DocumentConfiguration {
            title: "Pengaruh Media Sosial".to_string(),
            topic_description: "Dampak media sosial".to_string(),
            selected_chapters: selected.iter().map(|s| s.to_string()).collect(),
            ..DocumentConfiguration::default()
        }
    }

    fn academic_list() -> ChapterList {
        ChapterList::defaults(DocumentMode::Academic)
    }

    fn document(outcome: PipelineOutcome) -> GenerationResult {
        match outcome {
            PipelineOutcome::Document(result) => result,
            other => panic!("expected a document, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_combined_text_in_chapter_order() {
        let (pipeline, requests) = pipeline(MockLlmClient::texts(&["Text1", "Text2"]));
        // Picked in reverse; the list order wins.
        let config = config_with(&["Bab 2: Kajian Pustaka", "Bab 1: Pendahuluan"]);

        let result = document(pipeline.run(&config, &academic_list()).await.unwrap());

        assert_eq!(
            result.text,
            "# Bab 1: Pendahuluan\n\nText1\n\n# Bab 2: Kajian Pustaka\n\nText2"
        );
        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].prompt.contains("bab \"Bab 1: Pendahuluan\""));
        assert!(requests[1].prompt.contains("bab \"Bab 2: Kajian Pustaka\""));
        assert!(requests.iter().all(|r| r.tier == ModelTier::Chapter));
    }

    #[tokio::test]
    async fn test_context_carries_every_previous_chapter() {
        let (pipeline, requests) =
            pipeline(MockLlmClient::texts(&["Isi pertama", "Isi kedua", "Isi ketiga"]));
        let config = config_with(&[
            "Bab 1: Pendahuluan",
            "Bab 2: Kajian Pustaka",
            "Bab 3: Metodologi Penelitian",
        ]);

        pipeline.run(&config, &academic_list()).await.unwrap();

        let requests = requests.lock().unwrap();
        assert!(!requests[0].prompt.contains("AWAL DARI"));
        assert!(requests[1].prompt.contains(
            "--- AWAL DARI: Bab 1: Pendahuluan ---\n\nIsi pertama\n\n--- AKHIR DARI: Bab 1: Pendahuluan ---"
        ));
        let third = &requests[2].prompt;
        assert!(third.contains("--- AWAL DARI: Bab 1: Pendahuluan ---\n\nIsi pertama"));
        assert!(third.contains(
            "--- AWAL DARI: Bab 2: Kajian Pustaka ---\n\nIsi kedua\n\n--- AKHIR DARI: Bab 2: Kajian Pustaka ---"
        ));
        assert!(!third.contains("Isi ketiga"));
    }

    #[tokio::test]
    async fn test_title_suggestions_outcome() {
        let (pipeline, requests) = pipeline(MockLlmClient::texts(&["1. Title A\n2. Title B\n\n3. Title C"]));
        let config = config_with(&[SUGGEST_CHAPTER_TITLES]);
        let chapters = ChapterList::defaults(DocumentMode::Book);

        let outcome = pipeline.run(&config, &chapters).await.unwrap();

        assert_eq!(
            outcome,
            PipelineOutcome::ChapterTitleSuggestions(vec![
                "Title A".to_string(),
                "Title B".to_string(),
                "Title C".to_string(),
            ])
        );
        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].tier, ModelTier::Utility);
        assert!(!requests[0].grounding);
    }

    #[tokio::test]
    async fn test_validation_happens_before_any_call() {
        let (pipeline, requests) = pipeline(MockLlmClient::texts(&["unused"]));
        let mut config = config_with(&["Bab 1: Pendahuluan"]);
        config.title = "   ".to_string();

        let err = pipeline.run(&config, &academic_list()).await.unwrap_err();
        assert!(matches!(err, GenerationError::Validation(ValidationError::EmptyTitle)));

        let config = config_with(&[SUGGEST_CHAPTER_TITLES, "Bab 1: Pendahuluan"]);
        let err = pipeline.run(&config, &academic_list()).await.unwrap_err();
        assert!(matches!(
            err,
            GenerationError::Validation(ValidationError::SuggestionMustBeAlone(_))
        ));

        assert_eq!(requests.lock().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_failure_mid_loop_aborts_run() {
        let (pipeline, requests) = pipeline(MockLlmClient::scripted(vec![
            Ok(GenerationResult::text("Text1")),
            Err(RemoteError::permanent("API key not valid")),
            Ok(GenerationResult::text("Text3")),
        ]));
        let config = config_with(&[
            "Bab 1: Pendahuluan",
            "Bab 2: Kajian Pustaka",
            "Bab 3: Metodologi Penelitian",
        ]);

        let err = pipeline.run(&config, &academic_list()).await.unwrap_err();

        assert!(matches!(err, GenerationError::Remote { .. }));
        assert_eq!(err.context(), Some("membuat bab \"Bab 2: Kajian Pustaka\""));
        assert_eq!(requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_sources_keep_order_without_dedup() {
        let web = |uri: &str| Source::Web {
            uri: uri.to_string(),
            title: uri.to_string(),
        };
        let (pipeline, requests) = pipeline(MockLlmClient::scripted(vec![
            Ok(GenerationResult {
                text: "A".to_string(),
                sources: vec![web("https://a"), web("https://b")],
            }),
            Ok(GenerationResult {
                text: "B".to_string(),
                sources: vec![web("https://a")],
            }),
        ]));
        let config = config_with(&["Bab 1: Pendahuluan", "Bab 2: Kajian Pustaka"]);

        let result = document(pipeline.run(&config, &academic_list()).await.unwrap());

        assert_eq!(result.sources, vec![web("https://a"), web("https://b"), web("https://a")]);
        assert!(requests.lock().unwrap().iter().all(|r| r.grounding));
    }

    #[tokio::test]
    async fn test_creative_chapters_are_not_grounded() {
        let (pipeline, requests) = pipeline(MockLlmClient::texts(&["Suatu hari"]));
        let mut config = config_with(&["Prolog"]);
        config.kind = DocumentKind::Novel;
        let chapters = ChapterList::defaults(DocumentMode::Creative);

        let result = document(pipeline.run(&config, &chapters).await.unwrap());

        assert_eq!(result.text, "# Prolog\n\nSuatu hari");
        assert!(!requests.lock().unwrap()[0].grounding);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overloaded_chapter_recovers_through_retry() {
        let (pipeline, requests) = pipeline(MockLlmClient::scripted(vec![
            Err(RemoteError::from_status(503, "The model is overloaded")),
            Err(RemoteError::from_status(503, "The model is overloaded")),
            Ok(GenerationResult::text("Text1")),
        ]));
        let config = config_with(&["Bab 1: Pendahuluan"]);
        let started = tokio::time::Instant::now();

        let result = document(pipeline.run(&config, &academic_list()).await.unwrap());

        assert_eq!(result.text, "# Bab 1: Pendahuluan\n\nText1");
        assert_eq!(requests.lock().unwrap().len(), 3);
        assert!(started.elapsed() >= Duration::from_millis(3000));
    }

    #[tokio::test]
    async fn test_unknown_chapters_are_skipped() {
        let (pipeline, requests) = pipeline(MockLlmClient::texts(&["Text1"]));
        let config = config_with(&["Bab Hilang", "Bab 1: Pendahuluan"]);

        let result = document(pipeline.run(&config, &academic_list()).await.unwrap());
        assert_eq!(result.text, "# Bab 1: Pendahuluan\n\nText1");

        let config = config_with(&["Bab Hilang"]);
        let err = pipeline.run(&config, &academic_list()).await.unwrap_err();
        assert!(matches!(err, GenerationError::Validation(ValidationError::NoChapters)));
        assert_eq!(requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_pipeline_makes_no_calls() {
        let mock = MockLlmClient::texts(&["Text1"]);
        let requests = mock.requests.clone();
        let token = CancellationToken::new();
        let pipeline = Pipeline::new(Box::new(mock), RetryPolicy::default()).with_cancellation(token.clone());
        token.cancel();

        let err = pipeline
            .run(&config_with(&["Bab 1: Pendahuluan"]), &academic_list())
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::Cancelled { .. }));
        assert_eq!(requests.lock().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_progress_reports_each_chapter() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let pipeline = Pipeline::new(Box::new(MockLlmClient::texts(&["1", "2"])), RetryPolicy::default())
            .with_progress(move |p| sink.borrow_mut().push((p.index, p.total, p.chapter.to_string())));
        let config = config_with(&["Bab 1: Pendahuluan", "Abstrak"]);

        pipeline.run(&config, &academic_list()).await.unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![
                (0, 2, "Bab 1: Pendahuluan".to_string()),
                (1, 2, "Abstrak".to_string()),
            ]
        );
    }

    #[test]
    fn test_accumulator_append_and_finish() {
        let acc = Accumulator::default().append("Bab 1", GenerationResult::text("Satu"));
        assert_eq!(acc.text, "\n\n# Bab 1\n\nSatu");
        assert_eq!(
            acc.context,
            "\n\n--- AWAL DARI: Bab 1 ---\n\nSatu\n\n--- AKHIR DARI: Bab 1 ---\n\n"
        );
        let result = acc.append("Bab 2", GenerationResult::text("Dua  ")).finish();
        assert_eq!(result.text, "# Bab 1\n\nSatu\n\n# Bab 2\n\nDua");
    }

    #[test]
    fn test_parse_numbered_titles() {
        assert_eq!(
            parse_numbered_titles("1. Awal\n  2.Tengah \n\n10. Akhir\nTanpa nomor\n3)"),
            vec!["Awal", "Tengah", "Akhir", "Tanpa nomor", "3)"]
        );
        assert!(parse_numbered_titles("\n\n").is_empty());
    }
}

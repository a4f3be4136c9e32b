use std::path::{Path, PathBuf};

use docqa_core::config::Settings;
use docqa_core::error::Error;
use docqa_core::types::RetrievedPassage;
use docqa_embed::ModelServices;
use docqa_llm::MockGenerator;
use docqa_rag::{
    build_prompt, citations, format_context, AnswerComposer, AnswerStatus, Persona, RagPipeline, NOT_FOUND_ANSWER,
};
use tempfile::TempDir;

fn passage(position: usize, label: &str, text: &str) -> RetrievedPassage {
    RetrievedPassage { position, score: 1.0, source_label: label.to_string(), text: text.to_string() }
}

fn settings(index_dir: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.data.index_dir = index_dir.to_string_lossy().into_owned();
    settings.models.use_fake = true;
    settings
}

fn pipeline(tmp: &TempDir, generator: MockGenerator) -> RagPipeline<MockGenerator> {
    RagPipeline::new(settings(&tmp.path().join("index")), ModelServices::fake(), generator)
}

fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
fn context_entries_are_labelled_and_blank_line_separated() {
    let passages = [passage(0, "a.pdf (PDF)", "first text"), passage(4, "b.xlsx (Excel)", "second text")];
    assert_eq!(format_context(&passages), "[Source: a.pdf (PDF)]\nfirst text\n\n[Source: b.xlsx (Excel)]\nsecond text");
}

#[test]
fn prompt_follows_template_and_persona() {
    let passages = [passage(0, "a.pdf (PDF)", "valve torque is 40 Nm")];
    let prompt = build_prompt("What torque?", &passages, Persona::PlantOperator);
    assert_eq!(
        prompt.user,
        "Question: What torque?\n\nContext:\n[Source: a.pdf (PDF)]\nvalve torque is 40 Nm\n\nProvide the answer with citations."
    );
    assert!(prompt.system.starts_with("You are a plant maintenance operator."));
    assert!(prompt.system.contains(NOT_FOUND_ANSWER));
    assert!(prompt.system.contains("square brackets"));
}

#[test]
fn citations_are_sorted_and_unique() {
    let passages = [
        passage(0, "zeta.pdf (PDF)", "x"),
        passage(1, "alpha.xlsx (Excel)", "y"),
        passage(2, "zeta.pdf (PDF)", "z"),
    ];
    assert_eq!(citations(&passages), vec!["alpha.xlsx".to_string(), "zeta.pdf".to_string()]);
}

#[test]
fn personas_parse_loosely() {
    assert_eq!("plant-operator".parse::<Persona>().unwrap(), Persona::PlantOperator);
    assert_eq!("Corporate Employee".parse::<Persona>().unwrap(), Persona::CorporateEmployee);
    assert_eq!("general_employee".parse::<Persona>().unwrap(), Persona::GeneralEmployee);
    assert!("astronaut".parse::<Persona>().is_err());
    for persona in Persona::ALL {
        assert_eq!(persona.to_string().parse::<Persona>().unwrap(), persona);
    }
    assert_eq!(Persona::default(), Persona::GeneralEmployee);
}

#[tokio::test]
async fn no_passages_skips_generation() {
    let composer = AnswerComposer::new(MockGenerator::default());
    let answer = composer.compose("anything?", &[], Persona::default()).await;
    assert_eq!(answer.status, AnswerStatus::NoContext);
    assert_eq!(answer.text, NOT_FOUND_ANSWER);
    assert!(composer.generator().prompts().is_empty());
}

#[tokio::test]
async fn generation_failure_is_reported_in_answer() {
    let composer = AnswerComposer::new(MockGenerator::failing());
    let passages = [passage(0, "a.pdf (PDF)", "text")];
    let answer = composer.compose("q", &passages, Persona::default()).await;
    assert_eq!(answer.status, AnswerStatus::GenerationFailed);
    assert!(answer.text.contains("mock LLM error"), "{}", answer.text);
    assert_eq!(answer.citations, vec!["a.pdf".to_string()]);
}

#[tokio::test]
async fn ingest_then_ask_end_to_end() {
    let tmp = TempDir::new().unwrap();
    let docs = tmp.path().join("docs");
    std::fs::create_dir_all(&docs).unwrap();
    write(&docs, "pumps.txt", "pump pressure must stay below ten bar");
    write(&docs, "leave.md", "annual leave requests go to HR");

    let rag = pipeline(&tmp, MockGenerator::with_responses(vec!["Keep it below ten bar [pumps.txt]".into()]));
    let report = rag.ingest(&[docs]).await.unwrap();
    assert_eq!(report.files_total, 2);
    assert_eq!(report.files_ok, 2);
    assert_eq!(report.chunks, 2);
    assert!(report.failures.is_empty());

    let response = rag.ask("pump pressure", Persona::PlantOperator, 1).await.unwrap();
    assert_eq!(response.passages.len(), 1);
    assert_eq!(response.passages[0].source_label, "pumps.txt (Text)");
    assert_eq!(response.answer.status, AnswerStatus::Generated);
    assert_eq!(response.answer.text, "Keep it below ten bar [pumps.txt]");
    assert_eq!(response.answer.citations, vec!["pumps.txt".to_string()]);

    let prompts = rag.composer().generator().prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].user.contains("[Source: pumps.txt (Text)]\npump pressure must stay below ten bar"));
    assert_eq!(prompts[0].system, Persona::PlantOperator.system_instruction());
}

#[tokio::test]
async fn bad_file_is_reported_and_others_indexed() {
    let tmp = TempDir::new().unwrap();
    let good = write(tmp.path(), "notes.txt", "boiler inspection every spring");
    let bad = write(tmp.path(), "legacy.xls", "not supported");

    let rag = pipeline(&tmp, MockGenerator::default());
    let report = rag.ingest(&[good, bad.clone()]).await.unwrap();
    assert_eq!(report.files_ok, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, bad);

    let passages = rag.search("boiler", 5).await.unwrap();
    assert_eq!(passages.len(), 1);
    assert_eq!(passages[0].doc_name(), "notes.txt");
}

#[tokio::test]
async fn all_inputs_failing_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let bad = write(tmp.path(), "legacy.xls", "not supported");
    let rag = pipeline(&tmp, MockGenerator::default());
    let err = rag.ingest(&[bad]).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::AllInputsFailed(1))));
    assert!(!rag.index_dir().exists());
}

#[tokio::test]
async fn empty_ingest_answers_without_context() {
    let tmp = TempDir::new().unwrap();
    let rag = pipeline(&tmp, MockGenerator::default());
    let report = rag.ingest(&[]).await.unwrap();
    assert_eq!(report.chunks, 0);

    assert!(rag.search("anything", 8).await.unwrap().is_empty());
    let response = rag.ask("anything", Persona::default(), 8).await.unwrap();
    assert!(response.passages.is_empty());
    assert_eq!(response.answer.status, AnswerStatus::NoContext);
    assert!(rag.composer().generator().prompts().is_empty());
}

#[tokio::test]
async fn asking_before_ingest_reports_missing_index() {
    let tmp = TempDir::new().unwrap();
    let rag = pipeline(&tmp, MockGenerator::default());
    let err = rag.ask("anything", Persona::default(), 8).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::NoIndex(_))));
    assert!(err.to_string().contains("run ingest first"));
}

#[tokio::test]
async fn reingest_replaces_index() {
    let tmp = TempDir::new().unwrap();
    let first = write(tmp.path(), "first.txt", "alpha beta gamma");
    let second = write(tmp.path(), "second.txt", "delta epsilon");
    let rag = pipeline(&tmp, MockGenerator::default());

    rag.ingest(&[first]).await.unwrap();
    rag.ingest(&[second]).await.unwrap();
    let passages = rag.search("alpha delta", 8).await.unwrap();
    assert_eq!(passages.len(), 1);
    assert_eq!(passages[0].doc_name(), "second.txt");
}

#[test]
fn configured_persona_is_used_by_default() {
    let tmp = TempDir::new().unwrap();
    let mut s = settings(&tmp.path().join("index"));
    s.persona = Some("corporate".into());
    let rag = RagPipeline::new(s, ModelServices::fake(), MockGenerator::default());
    assert_eq!(rag.default_persona().unwrap(), Persona::CorporateEmployee);
}

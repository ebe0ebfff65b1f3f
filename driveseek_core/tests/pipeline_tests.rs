//! Pipeline behavior against in-memory fakes: dedup, fallback, enrichment
//! loss-tolerance, and end-to-end ranking.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::json;

use driveseek_core::{
    enrich, fan_out_search, ChatCompleter, Drive, DriveSource, FileFinder, FileItem, FileRanker,
    NoExtraction, PipelineError, SearchQuery, Session, Site, PERSONAL_SITE_ID,
};

fn item(value: serde_json::Value) -> FileItem {
    serde_json::from_value(value).unwrap()
}

fn file(id: &str, name: &str, drive: &str) -> FileItem {
    item(json!({
        "id": id,
        "name": name,
        "webUrl": format!("https://files.example/{name}"),
        "parentReference": {"driveId": drive},
        "file": {"mimeType": "text/plain"}
    }))
}

#[derive(Default)]
struct FakeDriveSource {
    personal: Vec<FileItem>,
    sites: Vec<Site>,
    drives: HashMap<String, Vec<Drive>>,
    hits: HashMap<String, Vec<FileItem>>,
    metadata: HashMap<String, FileItem>,
    recent: Vec<FileItem>,
}

impl FakeDriveSource {
    fn with_metadata_for_all(mut self) -> Self {
        let mut metadata = HashMap::new();
        for item in self.personal.iter().chain(self.hits.values().flatten()) {
            metadata.insert(item.id.clone(), item.clone());
        }
        for item in &self.recent {
            metadata.insert(item.id.clone(), item.clone());
        }
        self.metadata = metadata;
        self
    }

    fn site(id: &str) -> Site {
        serde_json::from_value(json!({"id": id})).unwrap()
    }

    fn drive(id: &str) -> Drive {
        serde_json::from_value(json!({"id": id})).unwrap()
    }
}

#[async_trait]
impl DriveSource for FakeDriveSource {
    async fn discover_sites(&self, _session: &Session) -> Result<Vec<Site>, PipelineError> {
        Ok(self.sites.clone())
    }

    async fn list_drives(
        &self,
        _session: &Session,
        site_id: &str,
    ) -> Result<Vec<Drive>, PipelineError> {
        Ok(self.drives.get(site_id).cloned().unwrap_or_default())
    }

    async fn search_personal(
        &self,
        _session: &Session,
        _query: &str,
    ) -> Result<Vec<FileItem>, PipelineError> {
        Ok(self.personal.clone())
    }

    async fn search_drive(
        &self,
        _session: &Session,
        drive_id: &str,
        _query: &str,
    ) -> Result<Vec<FileItem>, PipelineError> {
        Ok(self.hits.get(drive_id).cloned().unwrap_or_default())
    }

    async fn recent_files(&self, _session: &Session) -> Result<Vec<FileItem>, PipelineError> {
        let mut items = self.recent.clone();
        for item in &mut items {
            item.tag_site(PERSONAL_SITE_ID);
        }
        Ok(items)
    }

    async fn item_metadata(
        &self,
        _session: &Session,
        _drive_id: &str,
        item_id: &str,
    ) -> Result<Option<FileItem>, PipelineError> {
        Ok(self.metadata.get(item_id).cloned())
    }
}

struct CannedCompleter(&'static str);

#[async_trait]
impl ChatCompleter for CannedCompleter {
    async fn complete(
        &self,
        _system: &str,
        _user: &str,
        _temperature: f32,
    ) -> Result<String, PipelineError> {
        Ok(self.0.to_string())
    }
}

struct FailingCompleter;

#[async_trait]
impl ChatCompleter for FailingCompleter {
    async fn complete(
        &self,
        _system: &str,
        _user: &str,
        _temperature: f32,
    ) -> Result<String, PipelineError> {
        Err(PipelineError::MalformedResponse("completion endpoint down".into()))
    }
}

fn session() -> Session {
    Session::new(Some("tester".into()), "bearer".into())
}

#[tokio::test]
async fn duplicate_identities_appear_once() {
    let source = FakeDriveSource {
        personal: vec![file("shared", "Budget.xlsx", "d-personal")],
        sites: vec![FakeDriveSource::site("site-1")],
        drives: HashMap::from([("site-1".to_string(), vec![FakeDriveSource::drive("d-1")])]),
        hits: HashMap::from([(
            "d-1".to_string(),
            vec![
                file("shared", "Budget.xlsx", "d-1"),
                file("unique", "Notes.txt", "d-1"),
            ],
        )]),
        ..Default::default()
    };

    let query = SearchQuery::parse("budget");
    let results = fan_out_search(&source, &session(), &query).await;

    assert_eq!(results.len(), 2);
    let shared = results.iter().find(|f| f.id == "shared").unwrap();
    // first seen via the personal drive, so it carries no site tag
    assert!(shared.site_id().is_none());
    let unique = results.iter().find(|f| f.id == "unique").unwrap();
    assert_eq!(unique.site_id(), Some("site-1"));
}

#[tokio::test]
async fn repeated_searches_yield_the_same_identity_set() {
    let source = FakeDriveSource {
        personal: vec![file("p1", "A.txt", "d-p")],
        sites: vec![FakeDriveSource::site("site-1")],
        drives: HashMap::from([("site-1".to_string(), vec![FakeDriveSource::drive("d-1")])]),
        hits: HashMap::from([(
            "d-1".to_string(),
            vec![file("s1", "B.txt", "d-1"), file("p1", "A.txt", "d-1")],
        )]),
        ..Default::default()
    };

    let query = SearchQuery::parse("anything");
    let first: std::collections::HashSet<String> = fan_out_search(&source, &session(), &query)
        .await
        .into_iter()
        .map(|f| f.id)
        .collect();
    let second: std::collections::HashSet<String> = fan_out_search(&source, &session(), &query)
        .await
        .into_iter()
        .map(|f| f.id)
        .collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}

#[tokio::test]
async fn zero_hits_fall_back_to_recent_files() {
    let source = FakeDriveSource {
        recent: vec![file("r1", "Recent.docx", "d-personal")],
        ..Default::default()
    };

    let query = SearchQuery::parse("nothing matches this");
    let results = fan_out_search(&source, &session(), &query).await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "r1");
    assert_eq!(results[0].site_id(), Some(PERSONAL_SITE_ID));
}

#[tokio::test]
async fn enrichment_drops_unresolvable_items_and_folders() {
    let mut source = FakeDriveSource::default();
    source.metadata.insert(
        "keep".to_string(),
        file("keep", "Keep.txt", "d-1"),
    );
    source.metadata.insert(
        "dir".to_string(),
        item(json!({
            "id": "dir",
            "name": "Archive",
            "parentReference": {"driveId": "d-1"},
            "folder": {"childCount": 4}
        })),
    );

    let mut tagged = file("keep", "Keep.txt", "d-1");
    tagged.tag_site("site-9");
    let input = vec![
        tagged,
        file("gone", "Gone.txt", "d-1"),
        file("dir", "Archive", "d-1"),
        item(json!({"id": "no-drive", "name": "Orphan.txt"})),
    ];

    let enriched = enrich(&source, &session(), input).await;
    assert_eq!(enriched.len(), 1);
    assert_eq!(enriched[0].id, "keep");
    // site tag from before enrichment survives when metadata lacks one
    assert_eq!(enriched[0].site_id(), Some("site-9"));
}

#[tokio::test]
async fn pipeline_ranks_and_filters_through_the_model_output() {
    let source = FakeDriveSource {
        personal: vec![
            file("a", "Budget.xlsx", "d-p"),
            file("b", "Notes.txt", "d-p"),
            file("c", "Old.docx", "d-p"),
        ],
        ..Default::default()
    }
    .with_metadata_for_all();

    let ranker = FileRanker::new(CannedCompleter(
        "Ranked files:\n1. Notes.txt\n2. Budget.xlsx\n3. Missing.pdf",
    ));
    let finder = FileFinder::new(source, ranker, NoExtraction);
    let output = finder.run(&session(), "Q4 2024 budget notes").await.unwrap();

    let names: Vec<&str> = output.ranked.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["Notes.txt", "Budget.xlsx"]);
    assert_eq!(output.unmatched, vec!["Missing.pdf"]);
    // summarization ran before ranking
    for item in &output.ranked {
        assert!(item.extracted_text.is_some());
    }
}

#[tokio::test]
async fn ranking_failure_propagates_to_the_caller() {
    let source = FakeDriveSource {
        personal: vec![file("a", "Budget.xlsx", "d-p")],
        ..Default::default()
    }
    .with_metadata_for_all();

    let finder = FileFinder::new(source, FileRanker::new(FailingCompleter), NoExtraction);
    assert!(finder.run(&session(), "budget").await.is_err());
}

#[tokio::test]
async fn empty_candidate_set_skips_the_model() {
    // FailingCompleter would error if the ranker called it
    let finder = FileFinder::new(
        FakeDriveSource::default(),
        FileRanker::new(FailingCompleter),
        NoExtraction,
    );
    let output = finder.run(&session(), "anything").await.unwrap();
    assert!(output.ranked.is_empty());
    assert!(output.unmatched.is_empty());
}

//! A deterministic, in-memory backend used for development and tests.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use super::{AuthService, FileService, LoginResponse, SearchService, SuggestService, UploadRequest};
use crate::core::{
    Category, FileRecord, SearchEngine, SearchRequest, SearchResponse, ServiceError, UserProfile,
};

const CATALOG_SIZE: usize = 200;

const SAMPLE_TITLES: [&str; 35] = [
    "Project Proposal", "Meeting Notes", "Budget Report", "User Manual", "Technical Specification",
    "Marketing Plan", "Sales Forecast", "Quarterly Review", "Product Roadmap", "Design Guidelines",
    "Team Photo", "Logo Design", "Banner Ad", "Screenshot", "Diagram",
    "Tutorial Video", "Demo Recording", "Presentation", "Webinar", "Training Material",
    "Podcast Episode", "Interview Recording", "Music Track", "Voice Memo", "Audio Note",
    "Database Backup", "Project Files", "Assets Package", "Source Code", "Documents Archive",
    "API Documentation", "Configuration File", "Script", "Library", "Component Code",
];

const SAMPLE_FILENAMES: [&str; 35] = [
    "proposal_v2.pdf", "notes_2024.docx", "budget_q1.xlsx", "manual.pdf", "spec_final.md",
    "marketing_plan.pptx", "forecast.xlsx", "review_q4.pdf", "roadmap.pdf", "guidelines.pdf",
    "team_photo.jpg", "logo.png", "banner_1200x600.jpg", "screenshot.png", "diagram.svg",
    "tutorial.mp4", "demo_recording.mov", "presentation.pptx", "webinar_2024.mp4", "training.mp4",
    "podcast_ep01.mp3", "interview.m4a", "track_final.mp3", "voice_memo.m4a", "audio_note.wav",
    "backup_2024.zip", "project_files.tar.gz", "assets.zip", "source.zip", "docs.rar",
    "api_docs.md", "config.json", "deploy.sh", "library.js", "component.vue",
];

const SAMPLE_USERS: [&str; 10] = [
    "Alice Johnson", "Bob Smith", "Charlie Brown", "Diana Prince", "Eve Anderson",
    "Frank Miller", "Grace Lee", "Henry Davis", "Iris Wang", "Jack Wilson",
];

/// Each category covers a band of five slots in the seeded draw; documents take two.
const CATEGORY_BY_GROUP: [Category; 7] = [
    Category::Document,
    Category::Document,
    Category::Image,
    Category::Video,
    Category::Audio,
    Category::Archive,
    Category::Code,
];

/// A repeatable pseudo-random value in `[0, 1)`.
fn seeded(seed: usize) -> f64 {
    let x = (seed as f64).sin() * 10000.0;
    x - x.floor()
}

fn pick<T: Copy>(items: &[T], seed: usize) -> T {
    let index = (seeded(seed) * items.len() as f64) as usize;
    items[index.min(items.len() - 1)]
}

/// Inserts `_<n>` before the first extension: `a.tar.gz` -> `a_7.tar.gz`.
fn numbered_filename(filename: &str, n: usize) -> String {
    match filename.split_once('.') {
        Some((stem, ext)) => format!("{stem}_{n}.{ext}"),
        None => format!("{filename}_{n}"),
    }
}

fn generate_catalog() -> Vec<FileRecord> {
    let now = Utc::now();
    (0..CATALOG_SIZE)
        .map(|i| {
            let n = i + 1;
            let title = pick(&SAMPLE_TITLES, i * 3);
            let filename_index =
                ((seeded(i * 3 + 1) * SAMPLE_FILENAMES.len() as f64) as usize).min(34);
            let category_slot = ((seeded(i * 5) * 35.0) as usize).min(34);
            let category = CATEGORY_BY_GROUP[category_slot / 5];
            let days_ago = (seeded(i * 7) * 365.0) as i64;

            FileRecord {
                id: format!("file_{n}"),
                title: format!("{title} {n}"),
                filename: numbered_filename(SAMPLE_FILENAMES[filename_index], n),
                category,
                uploaded_at: now - ChronoDuration::days(days_ago),
                uploaded_by: pick(&SAMPLE_USERS, i * 3 + 2).to_string(),
                uploaded_by_user_id: None,
                file_size: (seeded(i * 11) * 50_000_000.0) as u64 + 1000,
                metadata_text: format!(
                    "Metadata for {title} - tags: important, project, {}",
                    category.as_str().to_lowercase()
                ),
                download_url: format!("/api/files/download/file_{n}"),
            }
        })
        .collect()
}

struct MockSession {
    token: String,
    user: UserProfile,
}

/// Serves searches from an in-memory catalog and keeps a single mock login.
pub struct MockFilesApi {
    records: RwLock<Vec<FileRecord>>,
    session: Mutex<Option<MockSession>>,
    latency: Duration,
    next_id: AtomicU64,
}

impl Default for MockFilesApi {
    fn default() -> Self {
        Self::from_records(generate_catalog())
    }
}

impl MockFilesApi {
    /// The generated 200-record catalog with no simulated latency.
    pub fn new() -> Self {
        Self::default()
    }

    /// The generated catalog, with every call delayed by `latency`.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub fn from_records(records: Vec<FileRecord>) -> Self {
        let next_id = records.len() as u64 + 1;
        Self {
            records: RwLock::new(records),
            session: Mutex::new(None),
            latency: Duration::ZERO,
            next_id: AtomicU64::new(next_id),
        }
    }

    /// A snapshot of the catalog.
    pub fn records(&self) -> Vec<FileRecord> {
        self.records.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    async fn simulate_latency(&self, divisor: u32) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency / divisor.max(1)).await;
        }
    }

    fn current_user(&self) -> Result<UserProfile, ServiceError> {
        self.session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|s| s.user.clone())
            .ok_or(ServiceError::Unauthenticated)
    }

    /// The token issued by the last successful login, if still logged in.
    pub fn active_token(&self) -> Option<String> {
        self.session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|s| s.token.clone())
    }
}

#[async_trait]
impl SearchService for MockFilesApi {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, ServiceError> {
        self.simulate_latency(1).await;
        let (page, total) = {
            let records = self.records.read().unwrap_or_else(|e| e.into_inner());
            SearchEngine::execute(&records, request)
        };
        let results = page
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SearchResponse {
            results,
            total,
            page: request.page.max(1),
            size: request.size.max(1),
        })
    }
}

#[async_trait]
impl SuggestService for MockFilesApi {
    async fn suggest(&self, q: &str, categories: &[Category]) -> Result<Vec<String>, ServiceError> {
        self.simulate_latency(2).await;
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        Ok(SearchEngine::suggest(&records, q, categories))
    }
}

#[async_trait]
impl AuthService for MockFilesApi {
    async fn login(
        &self,
        email: &str,
        password: &str,
        _remember: bool,
    ) -> Result<LoginResponse, ServiceError> {
        self.simulate_latency(1).await;
        if email.trim().is_empty() || password.is_empty() {
            return Err(ServiceError::Validation(
                "Email and password are required".to_string(),
            ));
        }

        let token = format!("mock_token_{}", Utc::now().timestamp_millis());
        let user = UserProfile {
            id: "user_1".to_string(),
            email: email.to_string(),
            name: email.split('@').next().unwrap_or(email).to_string(),
            extra: Default::default(),
        };
        *self.session.lock().unwrap_or_else(|e| e.into_inner()) = Some(MockSession {
            token: token.clone(),
            user: user.clone(),
        });
        Ok(LoginResponse { token, user })
    }

    async fn logout(&self) -> Result<(), ServiceError> {
        self.simulate_latency(1).await;
        *self.session.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }

    async fn me(&self) -> Result<UserProfile, ServiceError> {
        self.simulate_latency(2).await;
        self.current_user()
    }
}

#[async_trait]
impl FileService for MockFilesApi {
    async fn upload(
        &self,
        upload: UploadRequest,
        on_progress: &(dyn Fn(u8) + Send + Sync),
    ) -> Result<serde_json::Value, ServiceError> {
        let user = self.current_user()?;
        if upload.file_name.trim().is_empty() {
            return Err(ServiceError::Validation("A file is required".to_string()));
        }

        for percent in [0u8, 25, 50, 75] {
            on_progress(percent);
            self.simulate_latency(4).await;
        }

        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let id = format!("file_{n}");
        let record = FileRecord {
            id: id.clone(),
            title: if upload.title.trim().is_empty() {
                upload.file_name.clone()
            } else {
                upload.title
            },
            filename: upload.file_name,
            category: upload.category,
            uploaded_at: Utc::now(),
            uploaded_by: user.name,
            uploaded_by_user_id: Some(user.id),
            file_size: upload.content.len() as u64,
            metadata_text: upload.metadata_text,
            download_url: format!("/api/files/download/{id}"),
        };
        let body = json!({ "file": &record });
        self.records
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);

        on_progress(100);
        Ok(body)
    }

    async fn delete(&self, file_id: &str) -> Result<(), ServiceError> {
        self.simulate_latency(1).await;
        let user = self.current_user()?;
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());

        let index = records
            .iter()
            .position(|r| r.id == file_id)
            .ok_or_else(|| ServiceError::NotFound(format!("File {file_id} not found")))?;

        if records[index].uploaded_by_user_id.as_deref() != Some(user.id.as_str()) {
            return Err(ServiceError::PermissionDenied(
                "You can only delete files you uploaded".to_string(),
            ));
        }
        records.remove(index);
        Ok(())
    }
}

//! Web form: build a mashup, zip it and email it

use anyhow::{anyhow, Context, Result};
use axum::{
    extract::{Form, State},
    response::Html,
    routing::get,
    Router,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use mashup_core::{
    config::Config,
    model::{parse_count, sanitize_filename, MIN_CLIP_SECONDS, MIN_VIDEO_COUNT},
    MashupRequest, Pipeline,
};
use mashup_deliver::{parse_recipient, zip_artifact, Mailer, SmtpSettings};

const PAGE: &str = include_str!("../../assets/index.html");

pub struct WebState {
    pipeline: Pipeline,
    /// Unusable SMTP settings are reported per request rather than at startup
    mailer: std::result::Result<Mailer, String>,
    temp_root: PathBuf,
}

impl WebState {
    pub fn new(pipeline: Pipeline, mailer: std::result::Result<Mailer, String>, temp_root: PathBuf) -> Self {
        Self {
            pipeline,
            mailer,
            temp_root,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MashupForm {
    #[serde(default)]
    singer: String,
    #[serde(default)]
    videos: String,
    #[serde(default)]
    duration: String,
    #[serde(default)]
    email: String,
}

pub async fn run(bind: Option<String>, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;
    let pipeline = Pipeline::from_config(&config)
        .context("Missing external tools; run `mashup doctor`")?;

    let mailer = SmtpSettings::from_config(&config.smtp)
        .and_then(Mailer::new)
        .map_err(|e| e.to_string());
    if let Err(ref e) = mailer {
        warn!("Email delivery disabled: {}", e);
    }

    let state = Arc::new(WebState::new(pipeline, mailer, config.temp_dir()));
    let app = router(state);

    let addr = bind.unwrap_or(config.web.bind);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

pub fn router(state: Arc<WebState>) -> Router {
    Router::new()
        .route("/", get(index).post(submit))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn index() -> Html<String> {
    Html(render_page(None))
}

async fn submit(State(state): State<Arc<WebState>>, Form(form): Form<MashupForm>) -> Html<String> {
    let message = match handle_submission(&state, &form).await {
        Ok(recipient) => format!("Success: mashup zip sent to {}.", recipient),
        Err(e) => {
            warn!("Web request for '{}' failed: {:#}", form.singer.trim(), e);
            format!("Error: {}", e)
        }
    };
    Html(render_page(Some(&message)))
}

/// Returns the address the archive went to
async fn handle_submission(state: &WebState, form: &MashupForm) -> Result<String> {
    let videos = parse_count(&form.videos, MIN_VIDEO_COUNT, "Number of videos")?;
    let duration = parse_count(&form.duration, MIN_CLIP_SECONDS, "Duration")?;
    let recipient = parse_recipient(&form.email)?;
    let mailer = state.mailer.as_ref().map_err(|e| anyhow!("{}", e))?;

    // Dropped when the handler ends or the client goes away
    tokio::fs::create_dir_all(&state.temp_root).await?;
    let workspace = tempfile::Builder::new()
        .prefix("mashup_web_")
        .tempdir_in(&state.temp_root)?;

    let stem = format!("{}_mashup", sanitize_filename(&form.singer));
    let output = workspace.path().join(format!("{}.mp3", stem));
    let request = MashupRequest::new(&form.singer, videos, duration, &output)?;

    let mashup = state.pipeline.run(&request).await?;
    let archive = zip_artifact(
        &mashup.output_path,
        &workspace.path().join(format!("{}.zip", stem)),
    )
    .await?;

    mailer.send_archive(recipient.clone(), &archive).await?;
    Ok(recipient.email.to_string())
}

fn render_page(message: Option<&str>) -> String {
    let block = message
        .map(|m| format!(r#"<div class="msg">{}</div>"#, escape_html(m)))
        .unwrap_or_default();
    PAGE.replace("{{message}}", &block)
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use mashup_core::assembler::MashupAssembler;
    use mashup_core::error::{AssembleError, FetchError, LocatorError, TrimError};
    use mashup_core::fetcher::AudioFetcher;
    use mashup_core::locator::VideoLocator;
    use mashup_core::model::{RawAudioAsset, TrimmedClip};
    use mashup_core::pipeline::Components;
    use mashup_core::trimmer::ClipTrimmer;
    use mashup_core::{MashupResult, VideoReference};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    /// Counts searches and finds nothing
    #[derive(Default)]
    struct NoVideos {
        searches: AtomicUsize,
    }

    #[async_trait]
    impl VideoLocator for NoVideos {
        async fn locate(&self, artist: &str, _: usize) -> Result<Vec<VideoReference>, LocatorError> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            Err(LocatorError::NoCandidates(artist.to_string()))
        }
    }

    #[async_trait]
    impl AudioFetcher for NoVideos {
        async fn fetch(&self, r: &VideoReference, _: &Path) -> Result<RawAudioAsset, FetchError> {
            Err(FetchError::Unavailable(r.url.clone()))
        }
    }

    #[async_trait]
    impl ClipTrimmer for NoVideos {
        async fn trim(&self, _: RawAudioAsset, _: u32, _: &Path) -> Result<TrimmedClip, TrimError> {
            Err(TrimError::EmptyInput)
        }
    }

    #[async_trait]
    impl MashupAssembler for NoVideos {
        async fn assemble(&self, _: &[TrimmedClip], _: &Path, _: &str) -> Result<MashupResult, AssembleError> {
            Err(AssembleError::NoClips)
        }
    }

    fn app(mailer: std::result::Result<Mailer, String>) -> (Router, Arc<NoVideos>, tempfile::TempDir) {
        let fake = Arc::new(NoVideos::default());
        let temp = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(
            Components {
                locator: fake.clone(),
                fetcher: fake.clone(),
                trimmer: fake.clone(),
                assembler: fake.clone(),
            },
            temp.path().to_path_buf(),
        );
        let state = Arc::new(WebState::new(pipeline, mailer, temp.path().to_path_buf()));
        (router(state), fake, temp)
    }

    fn test_mailer() -> Mailer {
        let settings = SmtpSettings::from_config(&mashup_core::config::SmtpConfig {
            host: Some("localhost".to_string()),
            port: 2525,
            username: Some("bot@example.com".to_string()),
            password: Some("secret".to_string()),
            from: None,
        })
        .unwrap();
        Mailer::new(settings).unwrap()
    }

    async fn post(app: Router, body: &str) -> String {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>alert("x") & 'y'</script>"#),
            "&lt;script&gt;alert(&quot;x&quot;) &amp; &#x27;y&#x27;&lt;/script&gt;"
        );
    }

    #[test]
    fn test_render_page() {
        let blank = render_page(None);
        assert!(blank.contains("<form"));
        assert!(!blank.contains("{{message}}"));
        assert!(!blank.contains(r#"class="msg""#));

        let page = render_page(Some("Error: <b>"));
        assert!(page.contains(r#"<div class="msg">Error: &lt;b&gt;</div>"#));
    }

    #[tokio::test]
    async fn test_index_and_health() {
        let (app, _, _temp) = app(Err("SMTP setting missing: smtp.host".to_string()));

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"ok");
    }

    #[tokio::test]
    async fn test_invalid_count_is_rejected_before_search() {
        let (app, fake, _temp) = app(Ok(test_mailer()));

        let page = post(app, "singer=Sharry+Maan&videos=5&duration=30&email=a%40example.com").await;

        assert!(page.contains("Error: Number of videos must be greater than 10."));
        assert_eq!(fake.searches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_email_is_rejected() {
        let (app, fake, _temp) = app(Ok(test_mailer()));

        let page = post(app, "singer=Sharry+Maan&videos=12&duration=30&email=nope").await;

        assert!(page.contains("Error: Invalid email address"));
        assert_eq!(fake.searches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_smtp_settings_reported() {
        let (app, fake, _temp) = app(Err("SMTP setting missing: smtp.host".to_string()));

        let page = post(app, "singer=Sharry+Maan&videos=12&duration=30&email=a%40example.com").await;

        assert!(page.contains("Error: SMTP setting missing: smtp.host"));
        assert_eq!(fake.searches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_pipeline_failure_sends_nothing() {
        let (app, fake, temp) = app(Ok(test_mailer()));

        let page = post(app, "singer=Nobody&videos=12&duration=30&email=a%40example.com").await;

        assert!(page.contains("Error: Search failed: No videos found for &#x27;Nobody&#x27;"));
        assert_eq!(fake.searches.load(Ordering::SeqCst), 1);
        assert!(std::fs::read_dir(temp.path()).unwrap().next().is_none());
    }
}

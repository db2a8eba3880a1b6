//! Request orchestration: validate input, upload the reference, generate,
//! persist and merge into history.

use crate::fal::{FalGenerationClient, FalHttpClient, FluxModels, GenerationService};
use crate::history::History;
use crate::image::ReferenceImage;
use crate::logbook::{LogEntry, RequestLog};
use crate::models::{
    parse_seed, parse_strength, AspectRatio, Config, GenerateInputs, GenerationRequest,
    ImageReference, UploadMode,
};
use crate::prompts::PromptCatalog;
use crate::storage::{AssetUploader, FalStorageClient, InlineUploader};
use crate::store::ImageStore;
use crate::{Error, Result};
use std::fs;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Form input after validation, before anything touches the network.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedInputs {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub raw: bool,
    pub seed: Option<i64>,
    pub reference: Option<(Vec<u8>, f64)>,
}

/// Validate raw inputs. Strength is only checked when a reference is attached.
pub fn normalize_inputs(inputs: &GenerateInputs) -> Result<NormalizedInputs> {
    let prompt = inputs.prompt.trim();
    if prompt.is_empty() {
        return Err(Error::Validation("prompt must not be empty".to_string()));
    }

    let aspect_ratio = inputs.aspect_ratio.parse::<AspectRatio>()?;
    let seed = parse_seed(inputs.seed.as_deref())?;

    let reference = match inputs.reference_image.as_ref().filter(|b| !b.is_empty()) {
        Some(bytes) => Some((bytes.clone(), parse_strength(inputs.reference_strength)?)),
        None => None,
    };

    Ok(NormalizedInputs {
        prompt: prompt.to_string(),
        aspect_ratio,
        raw: inputs.raw,
        seed,
        reference,
    })
}

/// Ties the generation service, asset uploader and image store together.
pub struct Studio {
    generator: Box<dyn GenerationService>,
    uploader: Box<dyn AssetUploader>,
    store: ImageStore,
    catalog: PromptCatalog,
    log: RequestLog,
}

/// Injectable service bundle used to construct [`Studio`] in tests/harnesses.
pub struct StudioServices {
    pub generator: Box<dyn GenerationService>,
    pub uploader: Box<dyn AssetUploader>,
    pub store: ImageStore,
    pub catalog: PromptCatalog,
    pub log: RequestLog,
}

impl Studio {
    pub fn with_services(services: StudioServices) -> Self {
        Self {
            generator: services.generator,
            uploader: services.uploader,
            store: services.store,
            catalog: services.catalog,
            log: services.log,
        }
    }

    /// Build the production services from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.require_fal_key()?.to_string();

        fs::create_dir_all(&config.output_dir)?;
        info!("Using output directory: {}", config.output_dir.display());

        // Reuse one HTTP connection pool across fal clients and downloads.
        let http_client = reqwest::Client::new();

        let generator = Box::new(FalGenerationClient::new_with_http(
            FalHttpClient::new_with_client(
                api_key.clone(),
                config.api_base.clone(),
                http_client.clone(),
            ),
            FluxModels {
                text: config.text_model.clone(),
                image: config.image_model.clone(),
            },
        ));

        let uploader: Box<dyn AssetUploader> = match config.upload_mode {
            UploadMode::Fal => Box::new(FalStorageClient::new_with_client(
                api_key,
                config.storage_base.clone(),
                http_client.clone(),
            )),
            UploadMode::Inline => {
                info!("Reference images will be inlined as data URLs");
                Box::new(InlineUploader::new())
            }
        };

        let store = ImageStore::new_with_client(&config.output_dir, http_client)
            .with_last_copy_dir(config.last_copy_dir.clone());

        Ok(Self::with_services(StudioServices {
            generator,
            uploader,
            store,
            catalog: PromptCatalog::load(config.prompt_file.as_deref()),
            log: RequestLog::new(config.log_file()),
        }))
    }

    pub fn store(&self) -> &ImageStore {
        &self.store
    }

    pub fn catalog(&self) -> &PromptCatalog {
        &self.catalog
    }

    pub fn random_prompt(&self) -> Option<String> {
        self.catalog.pick_random().map(str::to_string)
    }

    /// History rebuilt from the current month's partition.
    pub fn initial_history(&self) -> History {
        match self.store.current_partition() {
            Ok(partition) => History::load(&self.store, &partition),
            Err(e) => {
                warn!("Could not prepare the current partition: {}", e);
                History::default()
            }
        }
    }

    /// Run one generation and return `history` with the new images in front.
    ///
    /// On error `history` is left as it was. Files written before a failure
    /// stay on disk.
    pub async fn invoke(&self, inputs: &GenerateInputs, history: &History) -> Result<History> {
        let request_id = Uuid::new_v4();

        match self.run(request_id, inputs).await {
            Ok(paths) => {
                info!("[{}] Generated images: {:?}", request_id, paths);
                self.log.record(&LogEntry::completed(request_id, &paths));
                Ok(history.prepend(paths))
            }
            Err(e) => {
                error!("[{}] Generation request failed: {}", request_id, e);
                self.log.record(&LogEntry::failed(request_id, &e));
                Err(e)
            }
        }
    }

    async fn run(&self, request_id: Uuid, inputs: &GenerateInputs) -> Result<Vec<String>> {
        let normalized = normalize_inputs(inputs)?;

        let reference = match normalized.reference {
            Some((bytes, strength)) => Some(ImageReference {
                url: self.upload_reference(request_id, bytes).await?,
                strength,
            }),
            None => None,
        };

        let request = GenerationRequest {
            prompt: normalized.prompt,
            aspect_ratio: normalized.aspect_ratio,
            reference,
            raw: normalized.raw,
            seed: normalized.seed,
        };

        let model = self.generator.model_for(&request);
        info!(
            "[{}] Generating image with prompt {:?}, aspect ratio {}{}",
            request_id,
            request.prompt,
            request.aspect_ratio,
            request
                .reference
                .as_ref()
                .map(|r| format!(" and image prompt strength {}", r.strength))
                .unwrap_or_default()
        );
        self.log
            .record(&LogEntry::request(request_id, &model, &request));

        let mut result = self.generator.generate(&request).await?;

        let partition = self
            .store
            .current_partition()
            .map_err(|e| Error::Persistence(format!("cannot prepare partition: {}", e)))?;

        // Generation order is kept; no re-sorting by recency here.
        for (slot, image) in result.images.iter_mut().enumerate() {
            let local_path = self
                .store
                .persist(&image.remote_url, &partition, slot)
                .await?;
            image.local_path = Some(local_path);
        }

        Ok(result
            .images
            .into_iter()
            .filter_map(|image| image.local_path)
            .collect())
    }

    async fn upload_reference(&self, request_id: Uuid, bytes: Vec<u8>) -> Result<String> {
        let reference = ReferenceImage::decode(bytes).await?;
        let (width, height) = reference.dimensions();
        info!(
            "[{}] Uploading {}x{} {} reference image",
            request_id,
            width,
            height,
            reference.mime_type()
        );

        let url = self
            .uploader
            .upload_image(
                reference.bytes(),
                reference.mime_type(),
                &reference.upload_file_name(),
            )
            .await
            .map_err(|e| match e {
                Error::Upload(_) => e,
                other => Error::Upload(other.to_string()),
            })?;
        info!("[{}] Uploaded reference image to {}", request_id, url);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fal::MockGenerationClient;
    use crate::storage::MockAssetUploader;
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Harness {
        studio: Studio,
        generator: MockGenerationClient,
        uploader: MockAssetUploader,
        dir: TempDir,
    }

    fn build(generator: MockGenerationClient, uploader: MockAssetUploader) -> Harness {
        let dir = TempDir::new().unwrap();
        let studio = Studio::with_services(StudioServices {
            generator: Box::new(generator.clone()),
            uploader: Box::new(uploader.clone()),
            store: ImageStore::new(dir.path().join("output"))
                .with_last_copy_dir(Some(dir.path().to_path_buf())),
            catalog: PromptCatalog::from_prompts(vec!["a quiet harbor".to_string()]),
            log: RequestLog::new(dir.path().join("output").join("prompts.log")),
        });
        Harness {
            studio,
            generator,
            uploader,
            dir,
        }
    }

    async fn serve_image(server: &MockServer, route: &str, bytes: Vec<u8>) -> String {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(bytes))
            .mount(server)
            .await;
        format!("{}{}", server.uri(), route)
    }

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(2, 2, image::Rgb([0, 128, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn log_events(dir: &Path) -> Vec<String> {
        std::fs::read_to_string(dir.join("output").join("prompts.log"))
            .unwrap_or_default()
            .lines()
            .map(|line| {
                let value: serde_json::Value = serde_json::from_str(line).unwrap();
                value["event"].as_str().unwrap().to_string()
            })
            .collect()
    }

    #[test]
    fn test_normalize_rejects_blank_prompt() {
        let err = normalize_inputs(&GenerateInputs::new("   ")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_normalize_ignores_strength_without_reference() {
        let mut inputs = GenerateInputs::new("fox");
        inputs.reference_strength = 7.0;
        let normalized = normalize_inputs(&inputs).unwrap();
        assert_eq!(normalized.reference, None);
    }

    #[test]
    fn test_normalize_checks_strength_with_reference() {
        let inputs = GenerateInputs::new("fox").with_reference(vec![1], 1.5);
        assert!(matches!(
            normalize_inputs(&inputs),
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_invoke_prepends_new_image_to_history() {
        let server = MockServer::start().await;
        let url = serve_image(&server, "/files/fox.jpg", vec![7, 7, 7]).await;

        let harness = build(
            MockGenerationClient::new().with_urls(vec![url]),
            MockAssetUploader::new(),
        );
        let prior = History::new(vec!["output/09-2026/older.jpg".to_string()]);

        let inputs = GenerateInputs::new("a red fox").with_aspect_ratio("1:1");
        let history = harness.studio.invoke(&inputs, &prior).await.unwrap();

        assert_eq!(history.len(), 2);
        assert!(history.paths()[0].ends_with("/fox.jpg"));
        assert_eq!(history.paths()[1], "output/09-2026/older.jpg");
        assert_eq!(history.latest(), Some(history.paths()[0].as_str()));
        assert_eq!(std::fs::read(&history.paths()[0]).unwrap(), vec![7, 7, 7]);
        assert_eq!(
            std::fs::read(harness.dir.path().join("last0.jpg")).unwrap(),
            vec![7, 7, 7]
        );

        let sent = harness.generator.get_requests();
        assert_eq!(sent[0].aspect_ratio, AspectRatio::Square);
        assert_eq!(sent[0].seed, None);
        assert_eq!(harness.uploader.get_upload_count(), 0);
        assert_eq!(log_events(harness.dir.path()), ["request", "completed"]);
    }

    #[tokio::test]
    async fn test_invalid_seed_fails_before_any_network_call() {
        let harness = build(MockGenerationClient::new(), MockAssetUploader::new());
        let prior = History::new(vec!["a.jpg".to_string()]);

        let inputs = GenerateInputs::new("fox")
            .with_seed("abc")
            .with_reference(png_bytes(), 0.5);
        let err = harness.studio.invoke(&inputs, &prior).await.unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(harness.generator.get_call_count(), 0);
        assert_eq!(harness.uploader.get_upload_count(), 0);
        assert_eq!(log_events(harness.dir.path()), ["failed"]);
    }

    #[tokio::test]
    async fn test_reference_image_is_uploaded_and_sent() {
        let server = MockServer::start().await;
        let url = serve_image(&server, "/files/redux.png", vec![1]).await;

        let harness = build(
            MockGenerationClient::new().with_urls(vec![url]),
            MockAssetUploader::new().with_base_url("https://files.test".to_string()),
        );

        let inputs = GenerateInputs::new("fox")
            .with_reference(png_bytes(), 0.8)
            .with_seed("42");
        harness
            .studio
            .invoke(&inputs, &History::default())
            .await
            .unwrap();

        let uploads = harness.uploader.get_uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].content_type, "image/png");

        let sent = &harness.generator.get_requests()[0];
        let reference = sent.reference.as_ref().unwrap();
        assert!(reference.url.starts_with("https://files.test/reference_"));
        assert_eq!(reference.strength, 0.8);
        assert_eq!(sent.seed, Some(42));
        assert_eq!(
            harness.generator.model_for(sent),
            crate::models::DEFAULT_IMAGE_MODEL
        );
    }

    #[tokio::test]
    async fn test_undecodable_reference_is_validation_error() {
        let harness = build(MockGenerationClient::new(), MockAssetUploader::new());
        let inputs = GenerateInputs::new("fox").with_reference(b"junk".to_vec(), 0.4);

        let err = harness
            .studio
            .invoke(&inputs, &History::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(harness.uploader.get_upload_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_failure_is_distinct_from_generation_failure() {
        let harness = build(
            MockGenerationClient::new(),
            MockAssetUploader::new().with_failure(true),
        );
        let inputs = GenerateInputs::new("fox").with_reference(png_bytes(), 0.4);

        let err = harness
            .studio
            .invoke(&inputs, &History::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Upload(_)));
        assert_eq!(harness.generator.get_call_count(), 0);
    }

    #[tokio::test]
    async fn test_generation_failure_leaves_history_and_disk_untouched() {
        let harness = build(
            MockGenerationClient::new().with_failure("connection reset"),
            MockAssetUploader::new(),
        );
        let prior = History::new(vec!["output/09-2026/older.jpg".to_string()]);

        let err = harness
            .studio
            .invoke(&GenerateInputs::new("fox"), &prior)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Generation(_)));
        assert_eq!(prior.paths(), ["output/09-2026/older.jpg"]);
        let partition = harness.studio.store().current_partition().unwrap();
        assert!(harness
            .studio
            .store()
            .list_existing(&partition)
            .unwrap()
            .is_empty());
        assert_eq!(log_events(harness.dir.path()), ["request", "failed"]);
    }

    #[tokio::test]
    async fn test_partial_persistence_keeps_written_files() {
        let server = MockServer::start().await;
        let good = serve_image(&server, "/files/first.jpg", vec![1]).await;
        let missing = format!("{}/files/missing.jpg", server.uri());

        let harness = build(
            MockGenerationClient::new().with_urls(vec![good, missing]),
            MockAssetUploader::new(),
        );

        let err = harness
            .studio
            .invoke(&GenerateInputs::new("fox"), &History::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Network(_)));

        let partition = harness.studio.store().current_partition().unwrap();
        let listed = harness.studio.store().list_existing(&partition).unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].ends_with("/first.jpg"));
    }

    #[tokio::test]
    async fn test_colliding_file_names_overwrite() {
        let server = MockServer::start().await;
        let first = serve_image(&server, "/a/same.jpg", vec![1]).await;
        let second = serve_image(&server, "/b/same.jpg", vec![2]).await;

        let harness = build(
            MockGenerationClient::new().with_urls(vec![first, second]),
            MockAssetUploader::new(),
        );

        let history = harness
            .studio
            .invoke(&GenerateInputs::new("fox"), &History::default())
            .await
            .unwrap();
        let partition = harness.studio.store().current_partition().unwrap();
        let listed = harness.studio.store().list_existing(&partition).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(history.paths(), listed.as_slice());
        assert_eq!(std::fs::read(&listed[0]).unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn test_repeated_url_across_requests_lists_once() {
        let server = MockServer::start().await;
        let url = serve_image(&server, "/files/same.jpg", vec![5]).await;

        let harness = build(
            MockGenerationClient::new().with_urls(vec![url]),
            MockAssetUploader::new(),
        );

        let first = harness
            .studio
            .invoke(&GenerateInputs::new("one"), &History::default())
            .await
            .unwrap();
        let second = harness
            .studio
            .invoke(&GenerateInputs::new("two"), &first)
            .await
            .unwrap();

        let partition = harness.studio.store().current_partition().unwrap();
        let on_disk = harness.studio.store().list_existing(&partition).unwrap();
        assert_eq!(on_disk.len(), 1);
        assert_eq!(second.paths(), on_disk.as_slice());
        assert_eq!(second.latest(), Some(on_disk[0].as_str()));
    }

    #[tokio::test]
    async fn test_initial_history_and_random_prompt() {
        let harness = build(MockGenerationClient::new(), MockAssetUploader::new());
        assert!(harness.studio.initial_history().is_empty());
        assert_eq!(
            harness.studio.random_prompt().as_deref(),
            Some("a quiet harbor")
        );
    }

    #[test]
    fn test_from_config_requires_key() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::from_vars(|_| None).unwrap();
        config.output_dir = dir.path().join("output");

        assert!(matches!(
            Studio::from_config(&config),
            Err(Error::Config(_))
        ));

        config.fal_key = Some("key".to_string());
        config.upload_mode = UploadMode::Inline;
        let studio = Studio::from_config(&config).unwrap();
        assert!(studio.catalog().is_empty());
        assert!(dir.path().join("output").is_dir());
    }
}

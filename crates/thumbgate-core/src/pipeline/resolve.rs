//! Thumbnail resolution: source lookup, placeholder fallback, resize and
//! atomic persist, bounded by a deadline.

use image::{DynamicImage, GenericImageView, ImageFormat};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::time::timeout;

use crate::config::{Config, LimitsConfig};
use crate::error::{RequestError, RequestResult};
use crate::types::TransformDescriptor;

use super::codec::{format_for_extension, ImageCodec};
use super::hooks::ThumbnailHooks;

/// A thumbnail now present on disk.
#[derive(Debug, Clone)]
pub struct ResolvedThumbnail {
    /// Where the thumbnail was written
    pub destination: PathBuf,
    /// Image the thumbnail was generated from
    pub source: PathBuf,
    /// True if the placeholder stood in for a missing source
    pub used_placeholder: bool,
    /// Thumbnail width in pixels
    pub width: u32,
    /// Thumbnail height in pixels
    pub height: u32,
}

/// Everything the blocking render step needs, owned.
struct RenderJob {
    source: PathBuf,
    dummy: Option<PathBuf>,
    thumb_root: PathBuf,
    destination: PathBuf,
    width: u32,
    height: u32,
    extension: String,
    format: ImageFormat,
}

struct Rendered {
    image: DynamicImage,
    source: PathBuf,
    used_placeholder: bool,
}

/// Builds thumbnails for verified descriptors.
pub struct ThumbnailResolver {
    image_root: PathBuf,
    thumb_root: PathBuf,
    dummy: Option<PathBuf>,
    limits: LimitsConfig,
    renders: Arc<Semaphore>,
    codec: Arc<dyn ImageCodec>,
    hooks: Arc<dyn ThumbnailHooks>,
}

impl ThumbnailResolver {
    /// Create a resolver from storage/limit config and the injected collaborators.
    pub fn new(
        config: &Config,
        codec: Arc<dyn ImageCodec>,
        hooks: Arc<dyn ThumbnailHooks>,
    ) -> Self {
        Self {
            image_root: config.image_root(),
            thumb_root: config.thumb_root(),
            dummy: config.dummy_path(),
            limits: config.limits.clone(),
            renders: Arc::new(Semaphore::new(config.limits.max_concurrent_renders)),
            codec,
            hooks,
        }
    }

    /// `{image_root}/{id}_{hash}.{extension}`
    pub fn source_path(&self, descriptor: &TransformDescriptor) -> PathBuf {
        self.image_root.join(descriptor.source_filename())
    }

    /// `{thumb_root}/{id}_{hash}_{w}x{h}_{transform}.{extension}`
    pub fn destination_path(&self, descriptor: &TransformDescriptor) -> PathBuf {
        self.thumb_root.join(descriptor.filename())
    }

    /// Generate and persist the thumbnail for an authentic descriptor.
    ///
    /// An existing destination file is overwritten. At most
    /// `limits.max_concurrent_renders` renders run at once; the deadline
    /// starts once a render slot is acquired.
    pub async fn resolve(
        &self,
        descriptor: &TransformDescriptor,
    ) -> RequestResult<ResolvedThumbnail> {
        let start = Instant::now();
        let destination = self.destination_path(descriptor);

        let format = format_for_extension(&descriptor.extension).ok_or_else(|| {
            RequestError::ResizeOrSaveFailure {
                path: destination.clone(),
                message: format!("unsupported output format '{}'", descriptor.extension),
            }
        })?;

        self.hooks.pre(descriptor).await?;

        let job = RenderJob {
            source: self.source_path(descriptor),
            dummy: self.dummy.clone(),
            thumb_root: self.thumb_root.clone(),
            destination: destination.clone(),
            width: descriptor.width,
            height: descriptor.height,
            extension: descriptor.extension.clone(),
            format,
        };
        let codec = Arc::clone(&self.codec);
        let timeout_ms = self.limits.resize_timeout_ms;

        // Held by the blocking task, so a render abandoned at the deadline
        // keeps its slot until it actually finishes.
        let permit = Arc::clone(&self.renders)
            .acquire_owned()
            .await
            .map_err(|e| RequestError::ResizeOrSaveFailure {
                path: destination.clone(),
                message: format!("Render slots unavailable: {}", e),
            })?;

        let render_result = timeout(Duration::from_millis(timeout_ms), async {
            tokio::task::spawn_blocking(move || {
                let result = render(codec.as_ref(), &job);
                drop(permit);
                result
            })
            .await
        })
        .await;

        let rendered = match render_result {
            Ok(Ok(Ok(rendered))) => rendered,
            Ok(Ok(Err(e))) => return Err(e),
            Ok(Err(e)) => {
                return Err(RequestError::ResizeOrSaveFailure {
                    path: destination,
                    message: format!("Task join error: {}", e),
                })
            }
            Err(_) => {
                return Err(RequestError::Timeout {
                    stage: "resize".to_string(),
                    timeout_ms,
                })
            }
        };

        self.hooks
            .post(descriptor, &rendered.image, &destination)
            .await?;

        let (width, height) = rendered.image.dimensions();
        tracing::info!(
            "Generated {:?} ({}x{}) from {:?} in {:?}",
            destination,
            width,
            height,
            rendered.source,
            start.elapsed()
        );

        Ok(ResolvedThumbnail {
            destination,
            source: rendered.source,
            used_placeholder: rendered.used_placeholder,
            width,
            height,
        })
    }
}

/// Load (falling back to the placeholder), fit and persist. Runs in spawn_blocking.
fn render(codec: &dyn ImageCodec, job: &RenderJob) -> RequestResult<Rendered> {
    let (image, source, used_placeholder) = match codec.open(&job.source) {
        Ok(image) => (image, job.source.clone(), false),
        Err(e) => match &job.dummy {
            Some(dummy) => {
                tracing::warn!(
                    "Source {:?} unavailable ({}), using placeholder {:?}",
                    job.source,
                    e,
                    dummy
                );
                let image = codec
                    .open(dummy)
                    .map_err(|e| RequestError::SourceUnavailable {
                        path: dummy.clone(),
                        message: e.to_string(),
                    })?;
                (image, dummy.clone(), true)
            }
            None => {
                return Err(RequestError::SourceUnavailable {
                    path: job.source.clone(),
                    message: e.to_string(),
                })
            }
        },
    };

    let thumbnail = codec.fit(image, job.width, job.height);
    persist(codec, &thumbnail, job)?;

    Ok(Rendered {
        image: thumbnail,
        source,
        used_placeholder,
    })
}

/// Write to a temp file in the thumbnail root, then rename onto the destination.
fn persist(
    codec: &dyn ImageCodec,
    thumbnail: &DynamicImage,
    job: &RenderJob,
) -> RequestResult<()> {
    let failure = |path: &Path, message: String| RequestError::ResizeOrSaveFailure {
        path: path.to_path_buf(),
        message,
    };

    let tmp = tempfile::Builder::new()
        .prefix(".thumbgate-")
        .suffix(&format!(".{}", job.extension))
        .tempfile_in(&job.thumb_root)
        .map_err(|e| failure(&job.thumb_root, format!("Cannot create temp file: {}", e)))?;

    codec
        .save(thumbnail, tmp.path(), job.format)
        .map_err(|e| failure(&job.destination, e.to_string()))?;

    tmp.persist(&job.destination).map_err(|e| {
        failure(
            &job.destination,
            format!("Cannot rename into place: {}", e.error),
        )
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::codec::ImageCrateCodec;
    use crate::pipeline::hooks::NoopHooks;
    use crate::types::Transform;
    use async_trait::async_trait;
    use image::ImageResult;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn descriptor(ext: &str) -> TransformDescriptor {
        TransformDescriptor {
            id: "4238".into(),
            hash: "bpM4oOcw".into(),
            width: 150,
            height: 200,
            transform: Transform::Scale,
            extension: ext.into(),
            signature: String::new(),
        }
    }

    struct Dirs {
        _tmp: tempfile::TempDir,
        config: Config,
    }

    fn dirs() -> Dirs {
        let tmp = tempfile::tempdir().unwrap();
        let images = tmp.path().join("images");
        let thumbs = tmp.path().join("thumbs");
        std::fs::create_dir_all(&images).unwrap();
        std::fs::create_dir_all(&thumbs).unwrap();
        let mut config = Config::default();
        config.storage.image_root = images;
        config.storage.thumb_root = thumbs;
        Dirs { _tmp: tmp, config }
    }

    fn resolver(config: &Config) -> ThumbnailResolver {
        ThumbnailResolver::new(config, Arc::new(ImageCrateCodec), Arc::new(NoopHooks))
    }

    fn write_source(config: &Config, name: &str, w: u32, h: u32) {
        DynamicImage::new_rgb8(w, h)
            .save(config.storage.image_root.join(name))
            .unwrap();
    }

    #[test]
    fn test_paths() {
        let mut config = Config::default();
        config.storage.image_root = PathBuf::from("/srv/img");
        config.storage.thumb_root = PathBuf::from("/srv/thumb");
        let r = resolver(&config);
        let d = descriptor("jpg");
        assert_eq!(r.source_path(&d), PathBuf::from("/srv/img/4238_bpM4oOcw.jpg"));
        assert_eq!(
            r.destination_path(&d),
            PathBuf::from("/srv/thumb/4238_bpM4oOcw_150x200_s.jpg")
        );
    }

    #[tokio::test]
    async fn test_resolve_generates_thumbnail() {
        let dirs = dirs();
        write_source(&dirs.config, "4238_bpM4oOcw.png", 600, 400);
        let resolved = resolver(&dirs.config).resolve(&descriptor("png")).await.unwrap();

        assert!(resolved.destination.exists());
        assert!(!resolved.used_placeholder);
        assert_eq!((resolved.width, resolved.height), (150, 100));
        let on_disk = image::open(&resolved.destination).unwrap();
        assert_eq!(on_disk.dimensions(), (150, 100));
    }

    #[tokio::test]
    async fn test_resolve_leaves_no_temp_files() {
        let dirs = dirs();
        write_source(&dirs.config, "4238_bpM4oOcw.png", 300, 300);
        resolver(&dirs.config).resolve(&descriptor("png")).await.unwrap();

        let names: Vec<_> = std::fs::read_dir(&dirs.config.storage.thumb_root)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("4238_bpM4oOcw_150x200_s.png")]);
    }

    #[tokio::test]
    async fn test_missing_source_without_dummy() {
        let dirs = dirs();
        let err = resolver(&dirs.config).resolve(&descriptor("jpg")).await.unwrap_err();
        assert!(matches!(err, RequestError::SourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_missing_source_uses_dummy() {
        let mut dirs = dirs();
        let dummy = dirs.config.storage.image_root.join("dummy.png");
        DynamicImage::new_rgb8(400, 400).save(&dummy).unwrap();
        dirs.config.storage.dummy = Some(dummy.clone());

        let resolved = resolver(&dirs.config).resolve(&descriptor("jpg")).await.unwrap();
        assert!(resolved.used_placeholder);
        assert_eq!(resolved.source, dummy);
        assert!(resolved.destination.exists());
    }

    #[tokio::test]
    async fn test_missing_dummy_is_source_unavailable() {
        let mut dirs = dirs();
        dirs.config.storage.dummy = Some(dirs.config.storage.image_root.join("gone.png"));
        let err = resolver(&dirs.config).resolve(&descriptor("jpg")).await.unwrap_err();
        assert!(matches!(err, RequestError::SourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_unknown_extension_fails_before_open() {
        let dirs = dirs();
        let err = resolver(&dirs.config).resolve(&descriptor("xyz")).await.unwrap_err();
        assert!(matches!(err, RequestError::ResizeOrSaveFailure { .. }));
    }

    #[tokio::test]
    async fn test_missing_thumb_root_is_save_failure() {
        let mut dirs = dirs();
        write_source(&dirs.config, "4238_bpM4oOcw.png", 300, 300);
        dirs.config.storage.thumb_root = dirs.config.storage.thumb_root.join("missing");
        let err = resolver(&dirs.config).resolve(&descriptor("png")).await.unwrap_err();
        assert!(matches!(err, RequestError::ResizeOrSaveFailure { .. }));
    }

    struct SlowCodec;

    impl ImageCodec for SlowCodec {
        fn open(&self, _path: &Path) -> ImageResult<DynamicImage> {
            std::thread::sleep(Duration::from_millis(300));
            Ok(DynamicImage::new_rgb8(10, 10))
        }
        fn fit(&self, image: DynamicImage, _w: u32, _h: u32) -> DynamicImage {
            image
        }
        fn save(&self, _image: &DynamicImage, _path: &Path, _f: ImageFormat) -> ImageResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_resize_deadline() {
        let mut dirs = dirs();
        dirs.config.limits.resize_timeout_ms = 20;
        let r = ThumbnailResolver::new(&dirs.config, Arc::new(SlowCodec), Arc::new(NoopHooks));
        let err = r.resolve(&descriptor("png")).await.unwrap_err();
        assert!(matches!(err, RequestError::Timeout { .. }));
    }

    /// Sleeps in `open` and records the peak number of concurrent renders.
    #[derive(Default)]
    struct GaugeCodec {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ImageCodec for GaugeCodec {
        fn open(&self, _path: &Path) -> ImageResult<DynamicImage> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(50));
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(DynamicImage::new_rgb8(10, 10))
        }
        fn fit(&self, image: DynamicImage, _w: u32, _h: u32) -> DynamicImage {
            image
        }
        fn save(&self, _image: &DynamicImage, _path: &Path, _f: ImageFormat) -> ImageResult<()> {
            Ok(())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_renders_are_bounded() {
        let mut dirs = dirs();
        dirs.config.limits.max_concurrent_renders = 2;
        dirs.config.limits.resize_timeout_ms = 5_000;
        let codec = Arc::new(GaugeCodec::default());
        let r = Arc::new(ThumbnailResolver::new(
            &dirs.config,
            codec.clone(),
            Arc::new(NoopHooks),
        ));

        let mut handles = Vec::new();
        for _ in 0..12 {
            let r = Arc::clone(&r);
            handles.push(tokio::spawn(async move {
                r.resolve(&descriptor("png")).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        assert!(codec.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(r.renders.available_permits(), 2);
    }

    #[tokio::test]
    async fn test_abandoned_render_keeps_its_slot() {
        let mut dirs = dirs();
        dirs.config.limits.resize_timeout_ms = 20;
        dirs.config.limits.max_concurrent_renders = 1;
        let r = ThumbnailResolver::new(&dirs.config, Arc::new(SlowCodec), Arc::new(NoopHooks));
        let err = r.resolve(&descriptor("png")).await.unwrap_err();
        assert!(matches!(err, RequestError::Timeout { .. }));
        assert_eq!(r.renders.available_permits(), 0);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(r.renders.available_permits(), 1);
    }

    #[derive(Default)]
    struct RecordingHooks {
        pre_calls: AtomicUsize,
        post_sizes: Mutex<Vec<(u32, u32)>>,
        veto: bool,
    }

    #[async_trait]
    impl ThumbnailHooks for RecordingHooks {
        async fn pre(&self, _d: &TransformDescriptor) -> RequestResult<()> {
            self.pre_calls.fetch_add(1, Ordering::SeqCst);
            if self.veto {
                return Err(RequestError::HookRejected {
                    hook: "pre",
                    message: "quota exceeded".into(),
                });
            }
            Ok(())
        }

        async fn post(
            &self,
            _d: &TransformDescriptor,
            thumbnail: &DynamicImage,
            destination: &Path,
        ) -> RequestResult<()> {
            assert!(destination.exists());
            self.post_sizes.lock().unwrap().push(thumbnail.dimensions());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_hooks_run_around_generation() {
        let dirs = dirs();
        write_source(&dirs.config, "4238_bpM4oOcw.png", 400, 800);
        let hooks = Arc::new(RecordingHooks::default());
        let r = ThumbnailResolver::new(&dirs.config, Arc::new(ImageCrateCodec), hooks.clone());
        r.resolve(&descriptor("png")).await.unwrap();

        assert_eq!(hooks.pre_calls.load(Ordering::SeqCst), 1);
        assert_eq!(*hooks.post_sizes.lock().unwrap(), vec![(100, 200)]);
    }

    #[tokio::test]
    async fn test_pre_hook_veto_stops_generation() {
        let dirs = dirs();
        write_source(&dirs.config, "4238_bpM4oOcw.png", 400, 800);
        let hooks = Arc::new(RecordingHooks {
            veto: true,
            ..Default::default()
        });
        let r = ThumbnailResolver::new(&dirs.config, Arc::new(ImageCrateCodec), hooks.clone());
        let err = r.resolve(&descriptor("png")).await.unwrap_err();

        assert!(matches!(err, RequestError::HookRejected { hook: "pre", .. }));
        assert!(!r.destination_path(&descriptor("png")).exists());
        assert!(hooks.post_sizes.lock().unwrap().is_empty());
    }
}

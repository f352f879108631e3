//! End-to-end scans with deterministic fakes for every capability.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rxscan_core::{CandidateRecord, DosageForm, HintBundle, MergedRecord, OcrCapture, Provenance, RawImage};
use rxscan_pipeline::{NullOcr, OcrSource, Pipeline, PipelineConfig, TextExtract, VisionExtract};

struct FakeVision {
    result: Option<CandidateRecord>,
    called: Arc<AtomicBool>,
}

#[async_trait]
impl VisionExtract for FakeVision {
    async fn extract(&self, _image_data_urls: &[String]) -> Option<CandidateRecord> {
        self.called.store(true, Ordering::SeqCst);
        self.result.clone()
    }
}

struct SlowVision;

#[async_trait]
impl VisionExtract for SlowVision {
    async fn extract(&self, _image_data_urls: &[String]) -> Option<CandidateRecord> {
        tokio::time::sleep(Duration::from_secs(600)).await;
        Some(CandidateRecord {
            name: Some("too late".to_string()),
            ..CandidateRecord::default()
        })
    }
}

struct FakeText {
    result: Option<CandidateRecord>,
    called: Arc<AtomicBool>,
}

#[async_trait]
impl TextExtract for FakeText {
    async fn extract(&self, _ocr_text: &str, _hints: &HintBundle) -> Option<CandidateRecord> {
        self.called.store(true, Ordering::SeqCst);
        self.result.clone()
    }
}

struct FakeOcr {
    text: String,
}

impl OcrSource for FakeOcr {
    fn recognize(&self, _image_bytes: &[u8]) -> OcrCapture {
        OcrCapture {
            text: self.text.clone(),
            confidence: 80,
        }
    }
}

fn tiny_png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(8, 8, image::Rgb([200, 200, 200]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn two_images() -> Vec<RawImage> {
    vec![
        RawImage::new(tiny_png(), "front.png", "image/png"),
        RawImage::new(tiny_png(), "back.png", "image/png"),
    ]
}

fn pipeline(
    vision: Option<CandidateRecord>,
    text: Option<CandidateRecord>,
    ocr_text: &str,
) -> (Pipeline, Arc<AtomicBool>, Arc<AtomicBool>) {
    let vision_called = Arc::new(AtomicBool::new(false));
    let text_called = Arc::new(AtomicBool::new(false));
    let pipeline = Pipeline::new(
        Arc::new(FakeVision {
            result: vision,
            called: Arc::clone(&vision_called),
        }),
        Arc::new(FakeText {
            result: text,
            called: Arc::clone(&text_called),
        }),
        Arc::new(FakeOcr {
            text: ocr_text.to_string(),
        }),
    );
    (pipeline, vision_called, text_called)
}

async fn scan(pipeline: &Pipeline) -> MergedRecord {
    pipeline.scan(&two_images()).await.unwrap()
}

#[tokio::test]
async fn vision_failure_falls_through_to_text_model() {
    // Scenario: the vision call dies on the network, the text model reads
    // the transcript fine.
    let text_record = CandidateRecord {
        name: Some("Paracetamol 500mg".to_string()),
        ..CandidateRecord::default()
    };
    let (pipeline, _, text_called) = pipeline(None, Some(text_record), "some label text");
    let merged = scan(&pipeline).await;

    assert_eq!(merged.source, Provenance::OcrLlm);
    assert_eq!(merged.record.name.as_deref(), Some("Paracetamol 500mg"));
    assert!(text_called.load(Ordering::SeqCst));
}

#[tokio::test]
async fn all_tiers_failing_still_returns_a_record() {
    let (pipeline, ..) = pipeline(None, None, "");
    let merged = scan(&pipeline).await;

    assert_eq!(merged.source, Provenance::RegexOnly);
    assert!(merged.record.name.is_none());
    assert!(merged.record.batch_number.is_none());

    // and the contract tag survives serialization
    let json = serde_json::to_value(&merged).unwrap();
    assert_eq!(json["_source"], "regex-only");
}

#[tokio::test]
async fn sufficient_vision_short_circuits_the_text_tier() {
    let vision_record = CandidateRecord {
        name: Some("Cetamol 500 mg".to_string()),
        batch_number: Some("FBSL 2209".to_string()),
        ..CandidateRecord::default()
    };
    let (pipeline, vision_called, text_called) =
        pipeline(Some(vision_record), None, "Batch FBSL 2209");
    let merged = scan(&pipeline).await;

    assert_eq!(merged.source, Provenance::Vision);
    assert!(vision_called.load(Ordering::SeqCst));
    assert!(!text_called.load(Ordering::SeqCst));
}

#[tokio::test]
async fn batch_only_vision_is_insufficient_but_still_votes() {
    let vision_record = CandidateRecord {
        batch_number: Some("FBLSL 2209".to_string()),
        ..CandidateRecord::default()
    };
    let (pipeline, _, text_called) = pipeline(Some(vision_record), None, "");
    let merged = scan(&pipeline).await;

    assert!(text_called.load(Ordering::SeqCst));
    assert_eq!(merged.source, Provenance::RegexOnly);
    // the correction was normalized and won the vote unopposed
    assert_eq!(merged.record.batch_number.as_deref(), Some("FBSL 2209"));
}

#[tokio::test]
async fn ocr_batch_and_partial_expiry_resolve_from_regex_tier() {
    let ocr = "Cetamol 500 mg\nBatch No: FBLSL 2209\nExp: OCT 24\nMfg by ACME 2024";
    let (pipeline, ..) = pipeline(None, None, ocr);
    let merged = scan(&pipeline).await;

    assert_eq!(merged.source, Provenance::RegexOnly);
    assert_eq!(merged.record.batch_number.as_deref(), Some("FBSL 2209"));
    assert_eq!(merged.record.expiry_date.as_deref(), Some("2024-10-01"));
    assert_eq!(merged.record.name.as_deref(), Some("Cetamol 500 mg"));
}

#[tokio::test]
async fn pack_size_multiplies_into_total_tablets() {
    let (pipeline, ..) = pipeline(None, None, "Amoxicillin\n10 CAPS x 10\n");
    let merged = scan(&pipeline).await;

    assert_eq!(merged.record.slips_count, Some(10));
    assert_eq!(merged.record.tablets_per_slip, Some(10));
    assert_eq!(merged.total_tablets, Some(100));
    assert_eq!(merged.dosage_form, DosageForm::Solid);
}

#[tokio::test]
async fn scattered_noise_never_becomes_a_batch_number() {
    let (pipeline, ..) = pipeline(None, None, "B N O 1 2 3 4\nnothing else");
    let merged = scan(&pipeline).await;

    assert_eq!(merged.record.batch_number, None);
    assert_eq!(merged.source, Provenance::RegexOnly);
}

#[tokio::test(start_paused = true)]
async fn hung_vision_tier_hits_the_timeout_and_degrades() {
    let text_called = Arc::new(AtomicBool::new(false));
    let pipeline = Pipeline::new(
        Arc::new(SlowVision),
        Arc::new(FakeText {
            result: None,
            called: Arc::clone(&text_called),
        }),
        Arc::new(NullOcr),
    )
    .with_config(PipelineConfig {
        vision_timeout: Duration::from_secs(1),
        text_timeout: Duration::from_secs(1),
        ..PipelineConfig::default()
    });

    let merged = pipeline.scan(&two_images()).await.unwrap();
    assert_eq!(merged.source, Provenance::RegexOnly);
    assert!(text_called.load(Ordering::SeqCst));
}

#[tokio::test]
async fn liquid_label_resolves_dose_and_bottle_volume() {
    let ocr = "Cough Syrup\nEach per 5 ml contains 125 mg / 5 ml\nNet: 100 ml";
    let (pipeline, ..) = pipeline(None, None, ocr);
    let merged = scan(&pipeline).await;

    assert_eq!(merged.dosage_form, DosageForm::Liquid);
    let liquid = merged.liquid.expect("liquid metadata present");
    assert_eq!(liquid.dose_ml, Some(5.0));
    assert_eq!(liquid.bottle_volume_ml, Some(100.0));
}

#[tokio::test]
async fn image_count_is_validated_before_anything_runs() {
    let (pipeline, vision_called, _) = pipeline(None, None, "");

    let one = vec![RawImage::new(tiny_png(), "only.png", "image/png")];
    assert!(pipeline.scan(&one).await.is_err());

    let many: Vec<RawImage> = (0..21)
        .map(|i| RawImage::new(tiny_png(), format!("img{i}.png"), "image/png"))
        .collect();
    assert!(pipeline.scan(&many).await.is_err());

    assert!(!vision_called.load(Ordering::SeqCst));
}

#[tokio::test]
async fn undecodable_image_is_a_caller_error() {
    let (pipeline, ..) = pipeline(None, None, "");
    let images = vec![
        RawImage::new(tiny_png(), "ok.png", "image/png"),
        RawImage::new(b"not an image".to_vec(), "broken.bin", "image/png"),
    ];
    let err = pipeline.scan(&images).await.unwrap_err();
    assert!(err.to_string().contains("broken.bin"));
}

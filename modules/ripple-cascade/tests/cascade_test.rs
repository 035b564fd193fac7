//! End-to-end cascade scenarios through the mock collaborators.

use std::sync::Arc;

use ripple_cascade::cascade::CascadeRunner;
use ripple_cascade::testing::{
    carousel_response, sample_catalog, sample_source, MockAssetStore, MockConverter, MockGenerator,
    MockRenderer, RecordingStore,
};
use ripple_common::{
    CascadeError, Catalog, DerivativeStatus, ImageStatus, JobStatus, SourceStatus,
};

struct Harness {
    store: Arc<RecordingStore>,
    generator: Arc<MockGenerator>,
    renderer: Arc<MockRenderer>,
    runner: CascadeRunner,
}

fn harness(generator: MockGenerator, renderer: MockRenderer, catalog: Catalog) -> Harness {
    let store = Arc::new(RecordingStore::new());
    let generator = Arc::new(generator);
    let renderer = Arc::new(renderer);
    let runner = CascadeRunner::new(
        store.clone(),
        generator.clone(),
        renderer.clone(),
        Arc::new(MockConverter::pages(2)),
        Arc::new(MockAssetStore::new()),
        catalog,
    );
    Harness {
        store,
        generator,
        renderer,
        runner,
    }
}

fn status_rank(status: JobStatus) -> u8 {
    match status {
        JobStatus::Queued => 0,
        JobStatus::Extracting => 1,
        JobStatus::Generating => 2,
        JobStatus::Imaging => 3,
        JobStatus::Completed => 4,
        JobStatus::Failed => 5,
    }
}

#[tokio::test(start_paused = true)]
async fn plan_completeness_survives_task_failures() {
    // 2 templates × 3 variations = 6 tasks; two of them fail.
    let h = harness(
        MockGenerator::new()
            .respond_when("Carousel", carousel_response())
            .fail_task(1)
            .fail_task(4),
        MockRenderer::new(),
        sample_catalog(),
    );
    let source = sample_source(3);
    let source_id = source.id;
    h.store.inner.add_source(source);

    let job = h.runner.run(source_id).await.expect("cascade should complete");

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.total_derivatives, 6);
    assert_eq!(job.completed_derivatives, 6);
    assert_eq!(h.store.inner.derivative_count(), 6);
    assert_eq!(h.generator.task_call_count(), 6);

    let failures: Vec<_> = h
        .store
        .inner
        .all_derivatives()
        .into_iter()
        .filter(|d| d.content.generation_error.is_some())
        .collect();
    assert_eq!(failures.len(), 2);
    for failed in failures {
        assert!(failed.content.primary_text.starts_with("⚠️ Generation failed"));
        assert_eq!(failed.status, DerivativeStatus::Draft);
    }
}

#[tokio::test(start_paused = true)]
async fn one_failed_task_leaves_siblings_intact() {
    // Single template, 5 variations, failure on index 2.
    let mut catalog = sample_catalog();
    catalog.platforms[0].templates.truncate(1);
    let h = harness(
        MockGenerator::new().fail_task(2),
        MockRenderer::new(),
        catalog,
    );
    let source = sample_source(5);
    let source_id = source.id;
    h.store.inner.add_source(source);

    h.runner.run(source_id).await.expect("cascade should complete");

    let derivatives = h.store.inner.all_derivatives();
    assert_eq!(derivatives.len(), 5);
    for derivative in &derivatives {
        if derivative.variation_index == 2 {
            assert!(derivative.content.generation_error.is_some());
        } else {
            assert_eq!(derivative.content.primary_text, "generated post");
            assert!(derivative.content.generation_error.is_none());
        }
    }
}

#[tokio::test(start_paused = true)]
async fn derivatives_persist_in_plan_order() {
    let h = harness(
        MockGenerator::new().respond_when("Carousel", carousel_response()),
        MockRenderer::new(),
        sample_catalog(),
    );
    let source = sample_source(2);
    let source_id = source.id;
    h.store.inner.add_source(source);

    h.runner.run(source_id).await.expect("cascade should complete");

    let order: Vec<(String, u32)> = h
        .store
        .inner
        .all_derivatives()
        .into_iter()
        .map(|d| (d.template_slug, d.variation_index))
        .collect();
    assert_eq!(
        order,
        vec![
            ("text-post".to_string(), 0),
            ("text-post".to_string(), 1),
            ("linkedin-carousel".to_string(), 0),
            ("linkedin-carousel".to_string(), 1),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn progress_is_monotonic_and_ends_at_100() {
    let h = harness(
        MockGenerator::new().respond_when("Carousel", carousel_response()),
        MockRenderer::new(),
        sample_catalog(),
    );
    let source = sample_source(3);
    let source_id = source.id;
    h.store.inner.add_source(source);

    let job = h.runner.run(source_id).await.expect("cascade should complete");
    assert_eq!(job.progress, 100);

    let progress = h.store.progress_values();
    for window in progress.windows(2) {
        assert!(window[1] >= window[0], "progress regressed: {progress:?}");
    }
    assert_eq!(*progress.last().unwrap(), 100);

    // The status sequence only ever moves forward.
    let ranks: Vec<u8> = h
        .store
        .job_updates()
        .into_iter()
        .map(|(status, _)| status_rank(status))
        .collect();
    for window in ranks.windows(2) {
        assert!(window[1] >= window[0], "status regressed: {ranks:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn visual_stage_only_touches_templates_with_specs() {
    // 1 platform, 2 templates, 3 variations ⇒ 6 derivatives; only the
    // carousel template has a visual spec ⇒ exactly 3 rendered.
    let h = harness(
        MockGenerator::new().respond_when("Carousel", carousel_response()),
        MockRenderer::new(),
        sample_catalog(),
    );
    let source = sample_source(3);
    let source_id = source.id;
    h.store.inner.add_source(source);

    let job = h.runner.run(source_id).await.expect("cascade should complete");

    assert_eq!(job.total_images, 3);
    assert_eq!(job.completed_images, 3);

    for derivative in h.store.inner.all_derivatives() {
        match derivative.template_slug.as_str() {
            "linkedin-carousel" => {
                assert_eq!(derivative.content.image_status, ImageStatus::Completed);
                // MockConverter::pages(2) → two images per carousel.
                assert_eq!(derivative.content.image_urls.len(), 2);
            }
            "text-post" => {
                assert_eq!(derivative.content.image_status, ImageStatus::Skipped);
                assert!(derivative.content.image_urls.is_empty());
            }
            other => panic!("unexpected template {other}"),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn rerun_discards_prior_drafts_but_keeps_published() {
    let h = harness(
        MockGenerator::new().respond_when("Carousel", carousel_response()),
        MockRenderer::new(),
        sample_catalog(),
    );
    let source = sample_source(3);
    let source_id = source.id;
    h.store.inner.add_source(source);

    let first_job = h.runner.run(source_id).await.expect("first run");
    assert_eq!(h.store.inner.derivative_count(), 6);

    // An editor approves one piece between runs.
    let mut approved = h.store.inner.all_derivatives().into_iter().next().unwrap();
    approved.status = DerivativeStatus::Approved;
    use ripple_cascade::traits::ContentStore;
    h.store.update_derivative(&approved).await.unwrap();

    let second_job = h.runner.run(source_id).await.expect("second run");
    assert_ne!(first_job.id, second_job.id);

    let derivatives = h.store.inner.all_derivatives();
    // 6 fresh rows plus the one approved survivor.
    assert_eq!(derivatives.len(), 7);
    let leftovers: Vec<_> = derivatives
        .iter()
        .filter(|d| d.job_id == first_job.id)
        .collect();
    assert_eq!(leftovers.len(), 1);
    assert_eq!(leftovers[0].status, DerivativeStatus::Approved);
}

#[tokio::test(start_paused = true)]
async fn failed_extraction_short_circuits_everything() {
    let h = harness(
        MockGenerator::new().extraction_fails("model unavailable"),
        MockRenderer::new(),
        sample_catalog(),
    );
    let source = sample_source(3);
    let source_id = source.id;
    h.store.inner.add_source(source);

    let err = h.runner.run(source_id).await.expect_err("must fail");
    assert!(matches!(err, CascadeError::Extraction(_)));

    // No fan-out happened and no progress was reported past extraction.
    assert_eq!(h.store.inner.derivative_count(), 0);
    assert_eq!(h.generator.task_call_count(), 0);
    assert_eq!(h.renderer.submit_call_count(), 0);
    assert!(h.store.progress_values().iter().all(|p| *p == 0));

    let jobs = h.store.inner.all_jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Failed);
    assert!(jobs[0].error.as_deref().unwrap().contains("model unavailable"));

    use ripple_cascade::traits::ContentStore;
    let source = h.store.get_source(source_id).await.unwrap().unwrap();
    assert_eq!(source.status, SourceStatus::Error);
}

#[tokio::test(start_paused = true)]
async fn empty_required_extraction_field_is_fatal() {
    let h = harness(
        MockGenerator::new().on_extraction(serde_json::json!({
            "themes": [],
            "takeaways": ["something"],
        })),
        MockRenderer::new(),
        sample_catalog(),
    );
    let source = sample_source(1);
    let source_id = source.id;
    h.store.inner.add_source(source);

    let err = h.runner.run(source_id).await.expect_err("must fail");
    assert!(matches!(err, CascadeError::EmptyRequiredField("themes")));
    assert_eq!(h.store.inner.derivative_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn empty_catalog_completes_right_after_extraction() {
    let h = harness(MockGenerator::new(), MockRenderer::new(), Catalog::default());
    let source = sample_source(5);
    let source_id = source.id;
    h.store.inner.add_source(source);

    let job = h.runner.run(source_id).await.expect("cascade should complete");

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress, 100);
    assert_eq!(job.total_derivatives, 0);
    assert_eq!(job.total_images, 0);
    assert_eq!(h.store.inner.derivative_count(), 0);

    use ripple_cascade::traits::ContentStore;
    let source = h.store.get_source(source_id).await.unwrap().unwrap();
    assert_eq!(source.status, SourceStatus::Completed);
    assert!(source.insights.is_some());
}

#[tokio::test(start_paused = true)]
async fn processing_source_is_rejected() {
    let h = harness(MockGenerator::new(), MockRenderer::new(), sample_catalog());
    let mut source = sample_source(1);
    source.status = SourceStatus::Processing;
    let source_id = source.id;
    h.store.inner.add_source(source);

    let err = h.runner.run(source_id).await.expect_err("must fail");
    assert!(matches!(err, CascadeError::AlreadyProcessing(id) if id == source_id));
}

#[tokio::test(start_paused = true)]
async fn unknown_source_is_rejected() {
    let h = harness(MockGenerator::new(), MockRenderer::new(), sample_catalog());
    let missing = uuid::Uuid::new_v4();

    let err = h.runner.run(missing).await.expect_err("must fail");
    assert!(matches!(err, CascadeError::SourceNotFound(id) if id == missing));
}

#[tokio::test(start_paused = true)]
async fn variation_prompts_rotate_style_angles() {
    let mut catalog = sample_catalog();
    catalog.platforms[0].templates.truncate(1);
    let h = harness(MockGenerator::new(), MockRenderer::new(), catalog);
    let source = sample_source(3);
    let source_id = source.id;
    h.store.inner.add_source(source);

    h.runner.run(source_id).await.expect("cascade should complete");

    let prompts = h.generator.task_prompts();
    assert_eq!(prompts.len(), 3);
    assert!(prompts[0].contains("Style angle (contrarian)"));
    assert!(prompts[1].contains("Style angle (narrative)"));
    assert!(prompts[2].contains("Style angle (data-first)"));
}

//! Single-derivative retry operations: job-less, idempotent, isolated.

use std::sync::Arc;

use ripple_cascade::retry::{retry_content, retry_images};
use ripple_cascade::store::MemoryStore;
use ripple_cascade::testing::{
    sample_catalog, sample_derivative, sample_insights, sample_source, MockAssetStore,
    MockConverter, MockGenerator, MockRenderer,
};
use ripple_cascade::traits::ContentStore;
use ripple_common::{CascadeError, DerivativeStatus, ImageStatus, Job, Slide};

#[tokio::test]
async fn retry_content_requires_an_extraction_result() {
    let store = MemoryStore::new();
    let source = sample_source(1);
    let job = Job::new(source.id);
    let derivative = sample_derivative(source.id, job.id, "text-post");
    store.add_source(source.clone());
    store.insert_derivative(&derivative).await.unwrap();

    let err = retry_content(
        &store,
        &MockGenerator::new(),
        &sample_catalog(),
        None,
        derivative.id,
    )
    .await
    .expect_err("no insights stored");
    assert!(matches!(err, CascadeError::NoExtraction(id) if id == source.id));
}

#[tokio::test]
async fn retry_content_overwrites_and_resets_to_draft() {
    let store = MemoryStore::new();
    let mut source = sample_source(1);
    source.insights = Some(sample_insights());
    let job = Job::new(source.id);

    let mut target = sample_derivative(source.id, job.id, "text-post");
    target.status = DerivativeStatus::Approved;
    let bystander = sample_derivative(source.id, job.id, "linkedin-carousel");

    store.add_source(source);
    store.insert_derivative(&target).await.unwrap();
    store.insert_derivative(&bystander).await.unwrap();

    let updated = retry_content(
        &store,
        &MockGenerator::new(),
        &sample_catalog(),
        None,
        target.id,
    )
    .await
    .expect("retry should succeed");

    assert_eq!(updated.content.primary_text, "generated post");
    assert_eq!(updated.status, DerivativeStatus::Draft);

    let stored = store.get_derivative(target.id).await.unwrap().unwrap();
    assert_eq!(stored.content.primary_text, "generated post");

    // The sibling derivative is untouched.
    let untouched = store.get_derivative(bystander.id).await.unwrap().unwrap();
    assert_eq!(untouched.content.primary_text, "existing text");
}

#[tokio::test]
async fn retry_content_failure_leaves_existing_content() {
    let store = MemoryStore::new();
    let mut source = sample_source(1);
    source.insights = Some(sample_insights());
    let job = Job::new(source.id);
    let derivative = sample_derivative(source.id, job.id, "text-post");
    store.add_source(source);
    store.insert_derivative(&derivative).await.unwrap();

    let err = retry_content(
        &store,
        &MockGenerator::new().fail_task(0),
        &sample_catalog(),
        None,
        derivative.id,
    )
    .await
    .expect_err("generation fails");
    assert!(matches!(err, CascadeError::Generation(_)));

    let stored = store.get_derivative(derivative.id).await.unwrap().unwrap();
    assert_eq!(stored.content.primary_text, "existing text");
}

#[tokio::test]
async fn retry_content_rejects_templates_missing_from_catalog() {
    let store = MemoryStore::new();
    let mut source = sample_source(1);
    source.insights = Some(sample_insights());
    let job = Job::new(source.id);
    let mut derivative = sample_derivative(source.id, job.id, "text-post");
    derivative.template_id = "t-deleted".to_string();
    store.add_source(source);
    store.insert_derivative(&derivative).await.unwrap();

    let err = retry_content(
        &store,
        &MockGenerator::new(),
        &sample_catalog(),
        None,
        derivative.id,
    )
    .await
    .expect_err("template gone");
    assert!(matches!(err, CascadeError::TemplateNotFound(id) if id == "t-deleted"));
}

#[tokio::test(start_paused = true)]
async fn retry_images_requires_a_visual_spec() {
    let store = MemoryStore::new();
    let source = sample_source(1);
    let job = Job::new(source.id);
    let derivative = sample_derivative(source.id, job.id, "text-post");
    store.add_source(source);
    store.insert_derivative(&derivative).await.unwrap();

    let err = retry_images(
        &store,
        &MockRenderer::new(),
        &MockConverter::pages(1),
        &MockAssetStore::new(),
        derivative.id,
    )
    .await
    .expect_err("no spec for text posts");
    assert!(matches!(err, CascadeError::NoVisualSpec(slug) if slug == "text-post"));
}

#[tokio::test(start_paused = true)]
async fn retry_images_overwrites_image_fields() {
    let store = MemoryStore::new();
    let source = sample_source(1);
    let job = Job::new(source.id);

    let mut derivative = sample_derivative(source.id, job.id, "linkedin-carousel");
    derivative.content.slides = Some(vec![Slide {
        title: "One".to_string(),
        body: "first".to_string(),
    }]);
    derivative.content.image_status = ImageStatus::Failed;
    derivative.content.image_error = Some("old failure".to_string());
    store.add_source(source);
    store.insert_derivative(&derivative).await.unwrap();

    let updated = retry_images(
        &store,
        &MockRenderer::new(),
        &MockConverter::pages(1),
        &MockAssetStore::new(),
        derivative.id,
    )
    .await
    .expect("retry should succeed");

    assert_eq!(updated.content.image_status, ImageStatus::Completed);
    assert_eq!(updated.content.image_urls.len(), 1);
    assert!(updated.content.image_error.is_none());
}

#[tokio::test(start_paused = true)]
async fn retry_images_absorbs_render_failures_onto_the_derivative() {
    let store = MemoryStore::new();
    let source = sample_source(1);
    let job = Job::new(source.id);

    let mut derivative = sample_derivative(source.id, job.id, "quote-card");
    derivative.content.primary_text = "A quotable line.".to_string();
    store.add_source(source);
    store.insert_derivative(&derivative).await.unwrap();

    let updated = retry_images(
        &store,
        &MockRenderer::new().submit_fails("renderer down"),
        &MockConverter::pages(1),
        &MockAssetStore::new(),
        derivative.id,
    )
    .await
    .expect("per-item failure is not an operation error");

    assert_eq!(updated.content.image_status, ImageStatus::Failed);
    assert!(updated
        .content
        .image_error
        .as_deref()
        .unwrap()
        .contains("renderer down"));
}

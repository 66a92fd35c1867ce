use date_calendar_online_sync::ingest::{ImageSource, IngestLimits};
use date_calendar_online_sync::models::EventKind;
use date_calendar_online_sync::planner::Planner;
use date_calendar_online_sync::store::mock::MockStore;
use date_calendar_online_sync::store::EventStore;
use image::{ImageBuffer, ImageOutputFormat, Rgb};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

fn png_source(name: &str, w: u32, h: u32) -> ImageSource {
    let img = ImageBuffer::from_fn(w, h, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
        .unwrap();
    ImageSource { name: name.into(), media_type: Some("image/png".into()), bytes: buf }
}

fn misnamed_txt() -> ImageSource {
    ImageSource {
        name: "notes.txt".into(),
        media_type: Some("image/png".into()),
        bytes: b"plain text pretending to be a photo".to_vec(),
    }
}

fn planner_for(store: &Arc<MockStore>) -> Planner {
    Planner::new(store.clone(), IngestLimits::default(), Duration::from_millis(10))
}

async fn started(store: &Arc<MockStore>) -> Planner {
    let planner = planner_for(store);
    planner.start();
    let mut rx = planner.sync().watch_state();
    rx.wait_for(|s| !s.loading).await.unwrap();
    planner
}

async fn wait_events(planner: &Planner, n: usize) {
    let mut rx = planner.sync().watch_state();
    rx.wait_for(|s| s.events.len() == n).await.unwrap();
}

#[tokio::test]
async fn create_then_list_shows_the_record() {
    let store = Arc::new(MockStore::new());
    let mut planner = started(&store).await;
    {
        let draft = planner.draft_mut();
        draft.title = "Dinner".into();
        draft.kind = EventKind::Food;
        draft.date = "2024-05-01".into();
    }
    let id = planner.save_draft().await.unwrap();
    wait_events(&planner, 1).await;
    let events = planner.events();
    assert_eq!(events[0].id, id);
    assert_eq!(events[0].title, "Dinner");
    assert_eq!(events[0].kind, EventKind::Food);
    assert_eq!(events[0].date.to_string(), "2024-05-01");
    assert!(events[0].images.is_empty());
    // Saving resets the form.
    assert!(planner.draft().title.is_empty());
    assert!(!planner.is_editing());
}

#[tokio::test]
async fn empty_title_is_rejected_before_write() {
    let store = Arc::new(MockStore::new());
    let mut planner = planner_for(&store);
    planner.draft_mut().date = "2024-05-01".into();
    assert!(planner.save_draft().await.is_err());
    assert!(store.fetch_snapshot().await.unwrap().is_empty());
}

#[tokio::test]
async fn title_only_edit_keeps_images_and_id() {
    let store = Arc::new(MockStore::new());
    let mut planner = started(&store).await;
    {
        let draft = planner.draft_mut();
        draft.title = "Dinner".into();
        draft.date = "2024-05-01".into();
        draft.images = vec!["data:image/jpeg;base64,AAAA".into()];
    }
    let id = planner.save_draft().await.unwrap();
    wait_events(&planner, 1).await;

    planner.begin_edit(&id).unwrap();
    assert!(planner.is_editing());
    planner.draft_mut().title = "Anniversary dinner".into();
    let saved_id = planner.save_draft().await.unwrap();
    assert_eq!(saved_id, id);

    let snapshot = store.fetch_snapshot().await.unwrap();
    assert_eq!(snapshot.len(), 1);
    let rec = snapshot.get(&id).unwrap();
    assert_eq!(rec.title, "Anniversary dinner");
    assert_eq!(rec.images, vec!["data:image/jpeg;base64,AAAA".to_string()]);
}

#[tokio::test]
async fn begin_edit_closes_the_detail_view() {
    let store = Arc::new(MockStore::new());
    let mut planner = started(&store).await;
    planner.draft_mut().title = "Dinner".into();
    planner.draft_mut().date = "2024-05-01".into();
    let id = planner.save_draft().await.unwrap();
    wait_events(&planner, 1).await;
    planner.open_detail(&id).unwrap();
    assert!(planner.detail().is_some());
    planner.begin_edit(&id).unwrap();
    assert!(planner.detail().is_none());
    assert_eq!(planner.draft().title, "Dinner");
}

#[tokio::test]
async fn delete_requires_confirmation() {
    let store = Arc::new(MockStore::new());
    let mut planner = started(&store).await;
    planner.draft_mut().title = "Dinner".into();
    planner.draft_mut().date = "2024-05-01".into();
    let id = planner.save_draft().await.unwrap();
    wait_events(&planner, 1).await;
    planner.open_detail(&id).unwrap();

    assert!(!planner.delete_event(&id, false).await.unwrap());
    assert_eq!(store.fetch_snapshot().await.unwrap().len(), 1);
    assert!(planner.detail().is_some());
}

#[tokio::test]
async fn confirmed_delete_closes_open_detail_view() {
    let store = Arc::new(MockStore::new());
    let mut planner = started(&store).await;
    planner.draft_mut().title = "Dinner".into();
    planner.draft_mut().date = "2024-05-01".into();
    let id = planner.save_draft().await.unwrap();
    wait_events(&planner, 1).await;
    planner.open_detail(&id).unwrap();

    assert!(planner.delete_event(&id, true).await.unwrap());
    assert!(planner.detail().is_none());
    assert!(store.fetch_snapshot().await.unwrap().is_empty());
}

#[tokio::test]
async fn batch_appends_to_draft_when_no_detail_open() {
    let store = Arc::new(MockStore::new());
    let mut planner = planner_for(&store);
    let report = planner
        .attach_images(vec![png_source("a.png", 1000, 800), misnamed_txt()])
        .await
        .unwrap();
    assert_eq!(report.appended, 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(planner.draft().images.len(), 1);
    assert!(planner.draft().images[0].starts_with("data:image/jpeg;base64,"));
    // Nothing was persisted: the draft is pure local state.
    assert!(store.fetch_snapshot().await.unwrap().is_empty());
}

#[tokio::test]
async fn batch_on_open_detail_writes_through_and_patches_optimistically() {
    let store = Arc::new(MockStore::new());
    let mut planner = started(&store).await;
    planner.draft_mut().title = "Trip".into();
    planner.draft_mut().kind = EventKind::Travel;
    planner.draft_mut().date = "2024-06-10".into();
    let id = planner.save_draft().await.unwrap();
    wait_events(&planner, 1).await;
    planner.open_detail(&id).unwrap();

    // 3 files, one of them a .txt misnamed as an image: exactly 2 stored.
    let report = planner
        .attach_images(vec![
            png_source("a.png", 900, 700),
            misnamed_txt(),
            png_source("b.png", 700, 900),
        ])
        .await
        .unwrap();
    assert_eq!(report.appended, 2);
    assert_eq!(report.skipped.len(), 1);

    // The open view is patched immediately, ahead of the next sync snapshot.
    assert_eq!(planner.detail().unwrap().images.len(), 2);
    let snapshot = store.fetch_snapshot().await.unwrap();
    assert_eq!(snapshot.get(&id).unwrap().images.len(), 2);
}

#[tokio::test]
async fn failed_store_write_leaves_local_state_unchanged() {
    let store = Arc::new(MockStore::new());
    let mut planner = started(&store).await;
    planner.draft_mut().title = "Trip".into();
    planner.draft_mut().date = "2024-06-10".into();
    let id = planner.save_draft().await.unwrap();
    wait_events(&planner, 1).await;
    planner.open_detail(&id).unwrap();

    store.set_offline(true);
    let err = planner.attach_images(vec![png_source("a.png", 900, 700)]).await;
    assert!(err.is_err());
    // No partial image list was committed anywhere.
    assert!(planner.detail().unwrap().images.is_empty());
    store.set_offline(false);
    assert!(store.fetch_snapshot().await.unwrap().get(&id).unwrap().images.is_empty());
}

#[tokio::test]
async fn remove_image_from_detail_and_draft() {
    let store = Arc::new(MockStore::new());
    let mut planner = started(&store).await;
    planner.draft_mut().title = "Trip".into();
    planner.draft_mut().date = "2024-06-10".into();
    planner.draft_mut().images =
        vec!["data:image/jpeg;base64,AAAA".into(), "data:image/jpeg;base64,BBBB".into()];
    let id = planner.save_draft().await.unwrap();
    wait_events(&planner, 1).await;

    planner.open_detail(&id).unwrap();
    planner.remove_image(0).await.unwrap();
    assert_eq!(planner.detail().unwrap().images, vec!["data:image/jpeg;base64,BBBB".to_string()]);
    let snapshot = store.fetch_snapshot().await.unwrap();
    assert_eq!(snapshot.get(&id).unwrap().images.len(), 1);
    assert!(planner.remove_image(5).await.is_err());

    planner.close_detail();
    planner.draft_mut().images = vec!["data:image/jpeg;base64,CCCC".into()];
    planner.remove_image(0).await.unwrap();
    assert!(planner.draft().images.is_empty());
}

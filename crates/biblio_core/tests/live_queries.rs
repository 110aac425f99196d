use biblio_core::{
    Author, AuthorRepository, Catalog, CatalogConfig, Category, CategoryRepository,
};
use std::time::Duration;
use tokio::time::{sleep, timeout};

const KEEP_ALIVE: Duration = Duration::from_millis(50);
const WAIT: Duration = Duration::from_secs(5);

fn catalog() -> Catalog {
    Catalog::open(&CatalogConfig::default().with_live_keep_alive(KEEP_ALIVE)).unwrap()
}

#[tokio::test]
async fn subscribers_see_relevant_writes() {
    let catalog = catalog();
    let live = catalog.categories().list().unwrap();
    let mut subscription = live.subscribe().unwrap();
    assert!(subscription.current().unwrap().is_empty());

    let category = Category::new("Mythology");
    catalog.categories().create(&category).unwrap();

    let next = timeout(WAIT, subscription.next())
        .await
        .expect("live query should publish after a write")
        .unwrap()
        .unwrap();
    assert_eq!(next, vec![category]);
}

#[tokio::test]
async fn unrelated_writes_do_not_publish() {
    let catalog = catalog();
    let live = catalog.categories().list_roots().unwrap();
    let mut subscription = live.subscribe().unwrap();

    catalog.authors().create(&Author::new("Homer of Chios")).unwrap();

    let outcome = timeout(Duration::from_millis(200), subscription.next()).await;
    assert!(outcome.is_err(), "unchanged result must not be republished");
}

#[tokio::test]
async fn driver_stops_after_keep_alive_once_unobserved() {
    let catalog = catalog();
    let live = catalog.authors().list().unwrap();

    let subscription = live.subscribe().unwrap();
    assert!(live.is_active());
    drop(subscription);

    sleep(KEEP_ALIVE * 6).await;
    assert!(!live.is_active());
    assert_eq!(live.subscriber_count(), 0);

    let author = Author::new("Sappho of Lesbos");
    catalog.authors().create(&author).unwrap();
    assert_eq!(live.current().unwrap(), vec![author.clone()]);

    let mut resumed = live.subscribe().unwrap();
    assert!(live.is_active());
    assert_eq!(resumed.current().unwrap(), vec![author.clone()]);

    catalog.authors().delete(author.id).unwrap();
    let next = timeout(WAIT, resumed.next()).await.unwrap().unwrap().unwrap();
    assert!(next.is_empty());
}

#[tokio::test]
async fn resubscribing_within_keep_alive_keeps_the_driver() {
    let catalog = catalog();
    let live = catalog
        .categories()
        .get_by_id(Category::new("Unsaved").id)
        .unwrap();

    let first = live.subscribe().unwrap();
    drop(first);
    let _second = live.subscribe().unwrap();

    sleep(KEEP_ALIVE * 6).await;
    assert!(live.is_active());
    assert_eq!(live.subscriber_count(), 1);
}

#[tokio::test]
async fn clones_share_one_evaluation() {
    let catalog = catalog();
    let live = catalog.authors().list().unwrap();
    let twin = live.clone();

    let mut a = live.subscribe().unwrap();
    let mut b = twin.subscribe().unwrap();
    assert_eq!(live.subscriber_count(), 2);

    let author = Author::new("Pindar of Thebes");
    catalog.authors().create(&author).unwrap();

    let seen_a = timeout(WAIT, a.next()).await.unwrap().unwrap().unwrap();
    let seen_b = timeout(WAIT, b.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(seen_a, seen_b);
    assert_eq!(seen_a.len(), 1);
}

/// Table lifecycle tests
///
/// Covers create, exists, delete, and the wait helpers on a probe table that
/// no other test touches, plus index spec construction for the movie indexes.
use serial_test::serial;

mod helpers;
use helpers::*;
use reelstore::catalog::{ByGenre, ByYearRating, Movie};
use reelstore::setup::IndexSpec;
use reelstore::table::SortKey;

/// Throwaway table used only by these tests
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
struct LifecycleProbe {
    probe_id: String,
    stamp: String,
}

impl DynamoTable for LifecycleProbe {
    type PK = String;
    type SK = String;
    const TABLE: &'static str = "tests_lifecycle_probe";
    const PARTITION_KEY: &'static str = "probe_id";
    const SORT_KEY: Option<&'static str> = Some("stamp");

    fn partition_key(&self) -> String {
        self.probe_id.clone()
    }

    fn sort_key(&self) -> SortKey<String> {
        Some(self.stamp.clone())
    }
}

#[test]
fn test_index_specs_carry_declared_names() {
    let genre = IndexSpec::of::<Movie, ByGenre>().unwrap();
    assert_eq!(genre.index_name(), "GenreIndex");

    let year_rating = IndexSpec::of::<Movie, ByYearRating>().unwrap();
    assert_eq!(year_rating.index_name(), "ReleaseYearRatingIndex");
}

#[tokio::test]
#[serial]
async fn test_create_exists_delete_cycle() {
    init_test_client().await;

    // Start from a clean slate whatever an earlier run left behind
    setup::delete_table::<LifecycleProbe>().await.unwrap();
    setup::wait_for_table_deleted::<LifecycleProbe>()
        .await
        .unwrap();
    assert!(!setup::table_exists::<LifecycleProbe>().await.unwrap());

    let _ = setup::create_table::<LifecycleProbe>().await.unwrap();
    setup::wait_for_table_active::<LifecycleProbe>()
        .await
        .unwrap();
    assert!(setup::table_exists::<LifecycleProbe>().await.unwrap());

    // Creating an existing table is absorbed
    let _ = setup::create_table::<LifecycleProbe>().await.unwrap();

    setup::delete_table::<LifecycleProbe>().await.unwrap();
    setup::wait_for_table_deleted::<LifecycleProbe>()
        .await
        .unwrap();
    assert!(!setup::table_exists::<LifecycleProbe>().await.unwrap());

    // Deleting a missing table is absorbed too
    setup::delete_table::<LifecycleProbe>().await.unwrap();
}

#[tokio::test]
#[serial]
async fn test_rebuild_table_leaves_it_usable() {
    init_test_client().await;

    setup::rebuild_table::<LifecycleProbe>(Vec::new())
        .await
        .unwrap();

    let probe = LifecycleProbe {
        probe_id: "probe-1".to_string(),
        stamp: "s1".to_string(),
    };
    probe.add_item().await.unwrap();

    // Rebuilding drops everything
    setup::rebuild_table::<LifecycleProbe>(Vec::new())
        .await
        .unwrap();

    let got = LifecycleProbe::get_item(&"probe-1".to_string(), Some(&"s1".to_string()))
        .await
        .unwrap();
    assert!(got.is_none(), "rebuild should leave an empty table");
}

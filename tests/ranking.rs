use tabledb::ranking::{rank, top_k};
use tabledb::TableError;

#[test]
fn ranks_highest_first() {
    assert_eq!(rank(&[10, 40, 25, 5]), vec![40, 25, 10, 5]);
    assert_eq!(rank(&[3, -1, 3, 0]), vec![3, 3, 0, -1]);
    assert!(rank(&[]).is_empty());
}

#[test]
fn top_k_slices() {
    let scores = [10, 40, 25, 5];
    assert_eq!(top_k(&scores, 1, 3).unwrap(), "40,25,10");
    assert_eq!(top_k(&scores, 2, 2).unwrap(), "25");
    assert_eq!(top_k(&scores, 3, 4).unwrap(), "10,5");
}

#[test]
fn top_k_clamps_to_available_ranks() {
    let scores = [10, 40];
    assert_eq!(top_k(&scores, 1, 10).unwrap(), "40,10");
    assert_eq!(top_k(&scores, 3, 10).unwrap(), "");
    assert_eq!(top_k(&[], 1, 5).unwrap(), "");
}

#[test]
fn top_k_rejects_bad_ranges() {
    assert!(matches!(
        top_k(&[1, 2], 0, 1),
        Err(TableError::InvalidRange { from: 0, to: 1 })
    ));
    assert!(matches!(
        top_k(&[1, 2], 2, 1),
        Err(TableError::InvalidRange { from: 2, to: 1 })
    ));
}

#[test]
fn input_is_not_reordered() {
    let scores = vec![1, 3, 2];
    let _ = top_k(&scores, 1, 3).unwrap();
    assert_eq!(scores, vec![1, 3, 2]);
}

use ordercheck_io::{read_efficacy, read_ordering, read_transmissions, write_text, Bounds};
use ordercheck_score::{
    count_infections, score_efficacy, score_ordering, OptimalDirection, PValueMethod, TimeWindow,
};
use tempfile::tempdir;

#[test]
fn index_cases_do_not_count() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("01.transmissions.txt.gz");
    write_text(&path, "A\tB\t1.0\nB\tC\t2.0\nNone\tA\t0.5\n").unwrap();

    let events = read_transmissions(&path, Bounds::default()).unwrap();
    let counts = count_infections(&events, TimeWindow::new(0.0, 3.0).unwrap());
    let entries: Vec<(&str, u64)> = counts.iter().collect();
    assert_eq!(entries, vec![("A", 1), ("B", 1)]);
}

#[test]
fn ordering_file_scored_against_window_counts() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("transmissions.txt");
    let ordering = dir.path().join("ordering.txt");
    write_text(
        &log,
        "None\tA\t0\nA\tB\t1\nA\tC\t2\nA\tD\t3\nB\tE\t4\nB\tF\t5\nC\tG\t6\nD\tH\t20\n",
    )
    .unwrap();
    write_text(&ordering, "A\nB\nC\n").unwrap();

    let events = read_transmissions(&log, Bounds::default()).unwrap();
    let counts = count_infections(&events, TimeWindow::new(0.0, 10.0).unwrap());
    assert_eq!(counts.get("D"), None);

    let candidate = read_ordering(&ordering, Bounds::default()).unwrap();
    let score = score_ordering(&counts, &candidate, OptimalDirection::Descending).unwrap();
    assert!((score.tau.tau - 1.0).abs() < 1e-12);
    assert_eq!(score.tau.method, PValueMethod::Exact);
    assert!(score.matched.missing.is_empty());
}

#[test]
fn efficacy_file_scored_against_descending_ranks() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("efficacy.tsv");
    write_text(&path, "A\t5.0\nB\t3.0\nC\t4.0\nD\t1.0\n").unwrap();

    let records = read_efficacy(&path, Bounds::default()).unwrap();
    let values: Vec<f64> = records.iter().map(|r| r.efficacy).collect();
    let tau = score_efficacy(&values).unwrap();
    assert!(tau.tau > 0.0 && tau.tau < 1.0);
    assert!((tau.tau - 2.0 / 3.0).abs() < 1e-12);
}

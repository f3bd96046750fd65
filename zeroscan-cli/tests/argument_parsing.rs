use zeroscan_cli::build_clap_app;

#[test]
fn parses_the_full_flag_set() {
    let matches = build_clap_app()
        .try_get_matches_from([
            "zeroscan",
            "--start",
            "100",
            "--end",
            "200",
            "--batch-size",
            "50",
            "--min-zeros",
            "3",
            "--min-inputs",
            "2",
            "--show-all-zeros",
            "--exclude-coinbase",
            "--name",
            "weekly-sweep",
            "--quiet",
        ])
        .unwrap();

    assert_eq!(matches.get_one::<u64>("start"), Some(&100));
    assert_eq!(matches.get_one::<u64>("end"), Some(&200));
    assert_eq!(matches.get_one::<u64>("batch-size"), Some(&50));
    assert_eq!(matches.get_one::<u32>("min-zeros"), Some(&3));
    assert_eq!(matches.get_one::<usize>("min-inputs"), Some(&2));
    assert!(matches.get_flag("show-all-zeros"));
    assert!(matches.get_flag("exclude-coinbase"));
    assert!(matches.get_flag("quiet"));
    assert_eq!(
        matches.get_one::<String>("name").map(String::as_str),
        Some("weekly-sweep")
    );
}

#[test]
fn defaults_match_the_analyzer_conventions() {
    let matches = build_clap_app()
        .try_get_matches_from(["zeroscan", "--start", "1", "--end", "2"])
        .unwrap();

    assert_eq!(matches.get_one::<u64>("batch-size"), Some(&1000));
    assert_eq!(matches.get_one::<u32>("min-zeros"), Some(&2));
    assert_eq!(matches.get_one::<usize>("min-inputs"), Some(&1));
    assert!(!matches.get_flag("show-all-zeros"));
    assert!(!matches.get_flag("exclude-coinbase"));
    assert!(!matches.get_flag("quiet"));
}

#[test]
fn a_missing_range_is_rejected() {
    assert!(build_clap_app()
        .try_get_matches_from(["zeroscan", "--start", "1"])
        .is_err());
    assert!(build_clap_app().try_get_matches_from(["zeroscan"]).is_err());
}

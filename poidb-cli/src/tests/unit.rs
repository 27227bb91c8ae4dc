//! Focused unit tests covering CLI configuration and argument parsing.

use super::*;
use geo::Coord;
use import::{ImportArgs, ImportConfig};
use inspect::{FindArgs, FindConfig, SearchArgs, SearchConfig, parse_bounds, parse_tag_pattern};
use maintain::{RemoveArgs, RemoveConfig};
use poidb_core::TagPattern;
use rstest::rstest;

#[rstest]
fn converting_find_without_database_errors() {
    let args = FindArgs {
        id: Some(3),
        ..FindArgs::default()
    };
    let err = FindConfig::try_from(args).expect_err("missing database should error");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_DATABASE);
            assert_eq!(env, ENV_FIND_DATABASE);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn converting_find_without_id_errors() {
    let args = FindArgs {
        database: Some(Utf8PathBuf::from("pois.db")),
        id: None,
    };
    let err = FindConfig::try_from(args).expect_err("missing id should error");
    assert!(matches!(
        err,
        CliError::MissingArgument {
            field: ARG_POI_ID,
            env: ENV_FIND_ID,
        }
    ));
}

#[rstest]
fn converting_remove_without_id_errors() {
    let args = RemoveArgs {
        database: Some(Utf8PathBuf::from("pois.db")),
        id: None,
    };
    let err = RemoveConfig::try_from(args).expect_err("missing id should error");
    assert!(matches!(
        err,
        CliError::MissingArgument {
            field: ARG_POI_ID,
            env: ENV_REMOVE_ID,
        }
    ));
}

#[rstest]
fn converting_import_without_source_errors() {
    let args = ImportArgs {
        database: Some(Utf8PathBuf::from("pois.db")),
        source: None,
    };
    let err = ImportConfig::try_from(args).expect_err("missing source should error");
    assert!(matches!(
        err,
        CliError::MissingArgument {
            field: ARG_IMPORT_SOURCE,
            env: ENV_IMPORT_SOURCE,
        }
    ));
}

#[rstest]
fn search_config_parses_bounds_tags_and_limit() {
    let args = SearchArgs {
        database: Some(Utf8PathBuf::from("pois.db")),
        bounds: Some("-5,-10.5,25,30".into()),
        category: vec![7],
        tag: vec!["amenity=ca%".into(), "name=".into()],
        limit: None,
    };
    let config = SearchConfig::try_from(args).expect("config should build");

    assert_eq!(config.bounds.min(), Coord { x: -10.5, y: -5.0 });
    assert_eq!(config.bounds.max(), Coord { x: 30.0, y: 25.0 });
    assert_eq!(config.categories, vec![7]);
    assert_eq!(
        config.patterns,
        vec![TagPattern::new("amenity", "ca%"), TagPattern::new("name", "")]
    );
    assert_eq!(config.limit, 0, "no limit by default");
}

#[rstest]
fn search_requires_bounds() {
    let args = SearchArgs {
        database: Some(Utf8PathBuf::from("pois.db")),
        ..SearchArgs::default()
    };
    let err = SearchConfig::try_from(args).expect_err("missing bounds should error");
    assert!(matches!(
        err,
        CliError::MissingArgument {
            field: ARG_BOUNDS,
            env: ENV_SEARCH_BOUNDS,
        }
    ));
}

#[rstest]
#[case("1,2,3")]
#[case("1,2,3,4,5")]
#[case("a,b,c,d")]
#[case("1,2,NaN,4")]
#[case("")]
fn malformed_bounds_are_rejected(#[case] value: &str) {
    match parse_bounds(value) {
        Err(CliError::InvalidBounds { value: reported }) => assert_eq!(reported, value),
        other => panic!("expected InvalidBounds, found {other:?}"),
    }
}

#[rstest]
fn reversed_bounds_are_normalised() {
    let rect = parse_bounds("25, 25, 5, 5").expect("bounds parse");
    assert_eq!(rect.min(), Coord { x: 5.0, y: 5.0 });
    assert_eq!(rect.max(), Coord { x: 25.0, y: 25.0 });
}

#[rstest]
#[case("amenity")]
#[case("=cafe")]
fn malformed_tag_patterns_are_rejected(#[case] value: &str) {
    assert!(matches!(
        parse_tag_pattern(value),
        Err(CliError::InvalidTagPattern { .. })
    ));
}

#[rstest]
fn tag_pattern_splits_on_first_equals() {
    assert_eq!(
        parse_tag_pattern("note=a=b").expect("pattern parses"),
        TagPattern::new("note", "a=b")
    );
}

#[rstest]
fn cli_parses_repeatable_search_flags() {
    let cli = Cli::try_parse_from([
        "poidb",
        "search",
        "--database",
        "pois.db",
        "--bounds",
        "-1,-1,1,1",
        "--category",
        "7",
        "--category",
        "8",
        "--tag",
        "amenity=cafe",
        "--limit",
        "5",
    ])
    .expect("arguments parse");
    match cli.command {
        Command::Search(args) => {
            assert_eq!(args.database, Some(Utf8PathBuf::from("pois.db")));
            assert_eq!(args.bounds.as_deref(), Some("-1,-1,1,1"));
            assert_eq!(args.category, vec![7, 8]);
            assert_eq!(args.tag, vec![String::from("amenity=cafe")]);
            assert_eq!(args.limit, Some(5));
        }
        other => panic!("expected search command, found {other:?}"),
    }
}

#[rstest]
fn find_merges_layers_with_cli_precedence() {
    use ortho_config::MergeComposer;
    use serde_json::json;

    let mut composer = MergeComposer::new();
    composer.push_file(json!({ "database": "from-file.db", "id": 1 }), None);
    composer.push_environment(json!({ "database": "from-env.db" }));
    composer.push_cli(json!({ "id": 9 }));

    let merged = FindArgs::merge_from_layers(composer.layers()).expect("layers merge");
    let config = FindConfig::try_from(merged).expect("config should build");
    assert_eq!(config.database, Utf8PathBuf::from("from-env.db"));
    assert_eq!(config.id, 9);
}

#[rstest]
fn invalid_layer_maps_to_configuration_error() {
    use ortho_config::MergeComposer;
    use serde_json::json;

    let mut composer = MergeComposer::new();
    composer.push_cli(json!({ "id": "not a number" }));

    let err = FindArgs::merge_from_layers(composer.layers())
        .map_err(CliError::from)
        .expect_err("invalid layer should fail");
    assert!(matches!(err, CliError::Configuration(_)));
}

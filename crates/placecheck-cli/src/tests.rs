use clap::Parser;

use super::*;

#[test]
fn parses_resolve_command() {
    let cli = Cli::try_parse_from(["placecheck", "resolve", "https://naver.me/abc"])
        .expect("expected valid cli args");
    assert!(matches!(cli.command, Commands::Resolve { url } if url == "https://naver.me/abc"));
}

#[test]
fn extract_defaults_to_all_tiers() {
    let cli = Cli::try_parse_from(["placecheck", "extract", "https://m.place.naver.com/place/1234567"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Commands::Extract {
            static_only: false,
            ..
        }
    ));
}

#[test]
fn diagnose_defaults_to_free_plan() {
    let cli = Cli::try_parse_from(["placecheck", "diagnose", "https://m.place.naver.com/place/1234567"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Commands::Diagnose {
            plan: Plan::Free,
            search: None,
            static_only: false,
            ..
        }
    ));
}

#[test]
fn diagnose_accepts_plan_and_search() {
    let cli = Cli::try_parse_from([
        "placecheck",
        "diagnose",
        "https://m.place.naver.com/place/1234567",
        "--plan",
        "paid",
        "--search",
        "강남 미용실",
        "--static-only",
    ])
    .expect("expected valid cli args");
    match cli.command {
        Commands::Diagnose {
            plan,
            search,
            static_only,
            ..
        } => {
            assert_eq!(plan, Plan::Pro);
            assert_eq!(search.as_deref(), Some("강남 미용실"));
            assert!(static_only);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn unknown_plan_is_rejected() {
    assert!(Cli::try_parse_from([
        "placecheck",
        "diagnose",
        "https://m.place.naver.com/place/1234567",
        "--plan",
        "gold",
    ])
    .is_err());
}

#[test]
fn missing_command_is_rejected() {
    assert!(Cli::try_parse_from(["placecheck"]).is_err());
}

#[test]
fn resolve_prints_canonical_forms() {
    let value = commands::resolve("https://map.naver.com/p/entry/place/1234567").expect("resolves");
    assert_eq!(value["id"], "1234567");
    assert!(value["canonicalUrl"]
        .as_str()
        .is_some_and(|u| u.contains("1234567")));
}

#[test]
fn resolve_rejects_foreign_hosts() {
    assert!(commands::resolve("https://example.com/place/1234567").is_err());
}

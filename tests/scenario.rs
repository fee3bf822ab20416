//! Editing a scenario file end to end: load, toggle, save, reload.

use std::path::Path;

use homecfg::{
    Config, Scenario, Session, Toggle, ToggleError,
    domain::{ChoiceId, Money, OverrideNote},
    engine::{MonotonyState, NonInteractive},
};
use tempfile::TempDir;

const COLONIAL: ChoiceId = ChoiceId(1);
const CRAFTSMAN: ChoiceId = ChoiceId(2);
const PORCH: ChoiceId = ChoiceId(3);
const FIREPLACE: ChoiceId = ChoiceId(4);

fn fixture() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/lot-12.yaml"))
}

fn load(path: &Path) -> Session {
    Scenario::load(path)
        .unwrap()
        .into_session(Config::default())
        .unwrap()
}

#[test]
fn prices_the_stored_selection() {
    let session = load(fixture());
    let price = session.price();

    assert_eq!(price.base_house, Money::from_dollars(300_000));
    assert_eq!(price.selections, Money::from_dollars(5_000));
    assert_eq!(price.lot_premium, Money::from_dollars(15_000));
    assert_eq!(price.total, Money::from_dollars(320_000));
}

#[test]
fn conflicting_elevation_needs_a_note() {
    let mut session = load(fixture());
    let revision = session.tree().revision();

    let result = session.toggle(Toggle::select(CRAFTSMAN), &mut NonInteractive::accept_all());

    assert!(matches!(result, Err(ToggleError::Cancelled(CRAFTSMAN))));
    assert!(session.tree().is_selected(COLONIAL));
    assert_eq!(session.tree().revision(), revision);
}

#[test]
fn overridden_elevation_survives_a_reload() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("lot-12.yaml");
    let mut session = load(fixture());
    let note = OverrideNote::new("approved by the sales manager").unwrap();

    let outcome = session
        .toggle(
            Toggle::select(CRAFTSMAN),
            &mut NonInteractive::accept_all().with_note(note.clone()),
        )
        .unwrap();

    assert_eq!(outcome.deselected, Some(COLONIAL));
    assert_eq!(outcome.impacted, vec![PORCH]);
    assert_eq!(outcome.price.total, Money::from_dollars(323_000));

    Scenario::from_session(&session).save(&path).unwrap();
    let reloaded = load(&path);

    assert!(reloaded.tree().is_selected(CRAFTSMAN));
    assert!(!reloaded.tree().is_selected(COLONIAL));
    assert!(!reloaded.tree().is_selected(PORCH));
    assert_eq!(
        reloaded.monotony(CRAFTSMAN).state,
        MonotonyState::Overridden(note)
    );
}

#[test]
fn non_standard_option_is_priced_from_the_choice() {
    let mut session = load(fixture());

    let outcome = session
        .toggle(Toggle::select(FIREPLACE), &mut NonInteractive::accept_all())
        .unwrap();

    assert!(outcome.deselected.is_none());
    assert_eq!(outcome.price.non_standard_selections, Money::from_dollars(4_000));
    assert_eq!(outcome.price.total, Money::from_dollars(324_000));
}

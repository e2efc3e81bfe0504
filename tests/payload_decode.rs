mod common;

use busboard::{ArrivalPayload, Eta, StopSlot};
use common::fixtures::gas_document;

#[test]
fn decodes_a_realistic_upstream_document() {
    let payload = ArrivalPayload::from_json(gas_document()).expect("decode");

    let stop_a = payload.stop(StopSlot::A).expect("stop_a");
    assert_eq!(stop_a.display_name(), Some("Opp Science Centre"));
    assert_eq!(stop_a.routes.len(), 2);
    assert_eq!(stop_a.routes[0].arrivals[0].eta, Eta::Minutes(6));
    // Numeric-string minutes decode like numbers.
    assert_eq!(stop_a.routes[1].arrivals[0].eta, Eta::Minutes(8));
    // Blank third estimate becomes the unknown placeholder, not an error.
    assert_eq!(stop_a.routes[1].arrivals[2].eta, Eta::Unknown);
    assert_eq!(stop_a.routes[1].arrivals[2].at, None);

    let stop_b = payload.stop(StopSlot::B).expect("stop_b");
    // Numeric route labels are accepted verbatim.
    assert_eq!(stop_b.routes[0].label, "52");
    assert_eq!(stop_b.routes[0].arrivals[0].eta, Eta::Due);

    // A nameless stop falls back to its code for display.
    let stop_c = payload.stop(StopSlot::C).expect("stop_c");
    assert_eq!(stop_c.display_name(), Some("45371"));
    assert_eq!(stop_c.routes.len(), 3);
}

#[test]
fn empty_document_yields_no_stops_but_decodes() {
    let payload = ArrivalPayload::from_json(b"{}").expect("decode");
    for slot in StopSlot::ALL {
        assert!(payload.stop(slot).is_none());
    }
}

#[test]
fn serialized_payload_round_trips() {
    let payload = ArrivalPayload::from_json(gas_document()).expect("decode");
    let json = serde_json::to_vec(&payload).expect("serialize");
    let reparsed = ArrivalPayload::from_json(&json).expect("reparse");
    // The debug endpoint serves this serialization; names and codes survive.
    assert_eq!(
        reparsed.stop(StopSlot::A).and_then(|s| s.display_name()),
        Some("Opp Science Centre")
    );
    assert_eq!(
        reparsed.stop(StopSlot::C).map(|s| s.routes.len()),
        Some(3)
    );
}

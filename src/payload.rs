//! Arrivals payload model and lenient upstream decoding.
//!
//! The upstream endpoint returns a JSON object with three stop slots, each
//! carrying a service list with up to three departure estimates per service.
//! Decoding is deliberately forgiving: missing slots become empty stops,
//! missing names fall back to stop codes, and unparsable estimates become
//! `Eta::Unknown`. A payload that decodes at all always renders.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Number of arrival fields reserved per route row.
pub const ARRIVAL_SLOTS: usize = 3;

/// Glyph rendered for missing data (normalized to `-` by mono font backends).
pub const PLACEHOLDER_GLYPH: &str = "\u{2014}";

/// The three fixed board slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StopSlot {
    A,
    B,
    C,
}

impl StopSlot {
    /// All slots in board order.
    pub const ALL: [StopSlot; 3] = [StopSlot::A, StopSlot::B, StopSlot::C];

    /// Title shown when a slot is entirely absent from the payload.
    pub fn fallback_title(self) -> &'static str {
        match self {
            StopSlot::A => "STOP A",
            StopSlot::B => "STOP B",
            StopSlot::C => "STOP C",
        }
    }
}

/// Stop codes requested from the upstream, one per slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopCodes {
    pub a: String,
    pub b: String,
    pub c: String,
}

impl StopCodes {
    pub fn new(a: impl Into<String>, b: impl Into<String>, c: impl Into<String>) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
            c: c.into(),
        }
    }

    /// Code for a given slot.
    pub fn for_slot(&self, slot: StopSlot) -> &str {
        match slot {
            StopSlot::A => &self.a,
            StopSlot::B => &self.b,
            StopSlot::C => &self.c,
        }
    }
}

/// Time-until-arrival estimate for one departure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Eta {
    /// Vehicle is arriving or already at the stop.
    Due,
    /// Whole minutes until arrival.
    Minutes(u32),
    /// No usable estimate.
    #[default]
    Unknown,
}

/// One departure estimate: an ETA plus an optional scheduled clock time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arrival {
    /// Scheduled clock time as supplied upstream (e.g. `"12:34"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at: Option<String>,
    pub eta: Eta,
}

impl Arrival {
    /// Text rendered for this field on the board.
    ///
    /// `"12:34 (6 min)"` when both the clock time and minutes are known,
    /// `"6 min"` / `"now"` without a clock time, and the placeholder glyph
    /// when nothing is known. Missing slots never render as blank space.
    pub fn label(&self) -> String {
        match (&self.at, self.eta) {
            (Some(at), Eta::Minutes(min)) => format!("{} ({} min)", at, min),
            (Some(at), Eta::Due) => format!("{} (now)", at),
            (Some(at), Eta::Unknown) => at.clone(),
            (None, Eta::Minutes(min)) => format!("{} min", min),
            (None, Eta::Due) => "now".to_string(),
            (None, Eta::Unknown) => PLACEHOLDER_GLYPH.to_string(),
        }
    }
}

/// One route row: a short label plus a fixed number of arrival fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Route number/name, shown verbatim.
    pub label: String,
    pub arrivals: [Arrival; ARRIVAL_SLOTS],
}

/// One stop: display name, identifying code, and its routes in display order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub code: String,
    pub routes: SmallVec<[Route; 4]>,
}

impl Stop {
    /// Empty stop titled by its code, used when the upstream has no data.
    pub fn empty(code: impl Into<String>) -> Self {
        Self {
            name: None,
            code: code.into(),
            routes: SmallVec::new(),
        }
    }

    /// Display name with fallback to the stop code.
    ///
    /// Returns `None` only when both the name and the code are blank; the
    /// planner then falls back to the slot title.
    pub fn display_name(&self) -> Option<&str> {
        let name = self.name.as_deref().map(str::trim).unwrap_or("");
        if !name.is_empty() {
            return Some(name);
        }
        let code = self.code.trim();
        (!code.is_empty()).then_some(code)
    }
}

/// Immutable input to one render call: three stop slots.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawPayload")]
pub struct ArrivalPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_a: Option<Stop>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_b: Option<Stop>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_c: Option<Stop>,
}

impl ArrivalPayload {
    /// Stop for a slot, when present.
    pub fn stop(&self, slot: StopSlot) -> Option<&Stop> {
        match slot {
            StopSlot::A => self.stop_a.as_ref(),
            StopSlot::B => self.stop_b.as_ref(),
            StopSlot::C => self.stop_c.as_ref(),
        }
    }

    /// Decode an upstream JSON document.
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Payload served when the upstream is unreachable or malformed: every
    /// requested stop is present, titled by its code, with zero routes.
    pub fn fallback(codes: &StopCodes) -> Self {
        Self {
            stop_a: Some(Stop::empty(codes.a.clone())),
            stop_b: Some(Stop::empty(codes.b.clone())),
            stop_c: Some(Stop::empty(codes.c.clone())),
        }
    }
}

// Raw upstream shapes. Everything is optional; normalization happens in the
// From impls so a partially malformed document still yields a payload.

#[derive(Debug, Default, Deserialize)]
struct RawPayload {
    #[serde(default)]
    stop_a: Option<RawStop>,
    #[serde(default)]
    stop_b: Option<RawStop>,
    #[serde(default)]
    stop_c: Option<RawStop>,
}

#[derive(Debug, Default, Deserialize)]
struct RawStop {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    code: Option<String>,
    /// Upstream service list.
    #[serde(default)]
    services: Vec<RawService>,
    /// Already-normalized route list, as serialized by the debug surface.
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Debug, Default, Deserialize)]
struct RawService {
    #[serde(default)]
    no: Option<serde_json::Value>,
    #[serde(default)]
    time1: Option<String>,
    #[serde(default)]
    min1: Option<serde_json::Value>,
    #[serde(default)]
    time2: Option<String>,
    #[serde(default)]
    min2: Option<serde_json::Value>,
    #[serde(default)]
    time3: Option<String>,
    #[serde(default)]
    min3: Option<serde_json::Value>,
}

impl From<RawPayload> for ArrivalPayload {
    fn from(raw: RawPayload) -> Self {
        Self {
            stop_a: raw.stop_a.map(Stop::from),
            stop_b: raw.stop_b.map(Stop::from),
            stop_c: raw.stop_c.map(Stop::from),
        }
    }
}

impl From<RawStop> for Stop {
    fn from(raw: RawStop) -> Self {
        let name = raw
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        let code = raw.code.unwrap_or_default().trim().to_string();
        let routes = if raw.routes.is_empty() {
            raw.services.into_iter().map(Route::from).collect()
        } else {
            raw.routes.into_iter().collect()
        };
        Self { name, code, routes }
    }
}

impl From<RawService> for Route {
    fn from(raw: RawService) -> Self {
        Self {
            label: label_text(raw.no),
            arrivals: [
                arrival_field(raw.time1, raw.min1),
                arrival_field(raw.time2, raw.min2),
                arrival_field(raw.time3, raw.min3),
            ],
        }
    }
}

fn label_text(value: Option<serde_json::Value>) -> String {
    let text = match value {
        Some(serde_json::Value::String(s)) => s.trim().to_string(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    if text.is_empty() {
        "?".to_string()
    } else {
        text
    }
}

fn arrival_field(time: Option<String>, min: Option<serde_json::Value>) -> Arrival {
    let at = time
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty() && t != "--:--");
    Arrival {
        at,
        eta: parse_eta(min),
    }
}

fn parse_eta(value: Option<serde_json::Value>) -> Eta {
    match value {
        Some(serde_json::Value::Number(n)) => match n.as_f64() {
            // Zero or negative minutes: the vehicle is effectively due.
            Some(v) if v <= 0.5 => Eta::Due,
            Some(v) => Eta::Minutes(v.round().min(u32::MAX as f64) as u32),
            None => Eta::Unknown,
        },
        Some(serde_json::Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Eta::Unknown;
            }
            if trimmed.eq_ignore_ascii_case("arr")
                || trimmed.eq_ignore_ascii_case("due")
                || trimmed.eq_ignore_ascii_case("now")
            {
                return Eta::Due;
            }
            match trimmed.parse::<u32>() {
                Ok(0) => Eta::Due,
                Ok(min) => Eta::Minutes(min),
                Err(_) => Eta::Unknown,
            }
        }
        _ => Eta::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_full_service_entry() {
        let body = br#"{
            "stop_a": {
                "name": "Opp Science Centre",
                "code": "45379",
                "services": [
                    {"no": "307", "time1": "12:04", "min1": 6,
                     "time2": "12:15", "min2": 17, "time3": "12:30", "min3": 32}
                ]
            }
        }"#;
        let payload = ArrivalPayload::from_json(body).expect("decode");
        let stop = payload.stop(StopSlot::A).expect("stop_a");
        assert_eq!(stop.display_name(), Some("Opp Science Centre"));
        assert_eq!(stop.routes.len(), 1);
        let route = &stop.routes[0];
        assert_eq!(route.label, "307");
        assert_eq!(route.arrivals[0].eta, Eta::Minutes(6));
        assert_eq!(route.arrivals[0].at.as_deref(), Some("12:04"));
        assert_eq!(route.arrivals[2].eta, Eta::Minutes(32));
    }

    #[test]
    fn minutes_accept_numeric_strings_and_arrival_markers() {
        assert_eq!(parse_eta(Some(serde_json::json!("7"))), Eta::Minutes(7));
        assert_eq!(parse_eta(Some(serde_json::json!("0"))), Eta::Due);
        assert_eq!(parse_eta(Some(serde_json::json!("Arr"))), Eta::Due);
        assert_eq!(parse_eta(Some(serde_json::json!(0))), Eta::Due);
        assert_eq!(parse_eta(Some(serde_json::json!(-2))), Eta::Due);
        assert_eq!(parse_eta(Some(serde_json::json!("soon"))), Eta::Unknown);
        assert_eq!(parse_eta(None), Eta::Unknown);
    }

    #[test]
    fn missing_slots_and_fields_never_fail() {
        let payload = ArrivalPayload::from_json(br#"{"stop_b": {"code": "45489"}}"#).expect("ok");
        assert!(payload.stop(StopSlot::A).is_none());
        let stop_b = payload.stop(StopSlot::B).expect("stop_b");
        assert_eq!(stop_b.display_name(), Some("45489"));
        assert!(stop_b.routes.is_empty());
        assert!(payload.stop(StopSlot::C).is_none());
    }

    #[test]
    fn blank_route_label_falls_back_to_question_mark() {
        let payload =
            ArrivalPayload::from_json(br#"{"stop_a": {"code": "1", "services": [{}]}}"#)
                .expect("ok");
        let stop = payload.stop(StopSlot::A).expect("stop_a");
        assert_eq!(stop.routes[0].label, "?");
        assert_eq!(stop.routes[0].arrivals[0].label(), PLACEHOLDER_GLYPH);
    }

    #[test]
    fn arrival_label_formats() {
        let field = |at: Option<&str>, eta| Arrival {
            at: at.map(str::to_string),
            eta,
        };
        assert_eq!(field(Some("12:04"), Eta::Minutes(6)).label(), "12:04 (6 min)");
        assert_eq!(field(Some("12:04"), Eta::Due).label(), "12:04 (now)");
        assert_eq!(field(None, Eta::Minutes(6)).label(), "6 min");
        assert_eq!(field(None, Eta::Due).label(), "now");
        assert_eq!(field(None, Eta::Unknown).label(), PLACEHOLDER_GLYPH);
    }

    #[test]
    fn placeholder_clock_time_is_dropped() {
        let arrival = arrival_field(Some("--:--".to_string()), None);
        assert_eq!(arrival.at, None);
        assert_eq!(arrival.eta, Eta::Unknown);
    }

    #[test]
    fn fallback_payload_titles_every_slot_by_code() {
        let codes = StopCodes::new("45379", "45489", "45371");
        let payload = ArrivalPayload::fallback(&codes);
        for slot in StopSlot::ALL {
            let stop = payload.stop(slot).expect("slot present");
            assert_eq!(stop.display_name(), Some(codes.for_slot(slot)));
            assert!(stop.routes.is_empty());
        }
    }
}

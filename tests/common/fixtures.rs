use busboard::ArrivalPayload;

/// Upstream document in the shape the arrivals endpoint actually returns.
pub fn gas_document() -> &'static [u8] {
    br#"{
        "stop_a": {
            "name": "Opp Science Centre",
            "code": "45379",
            "services": [
                {"no": "307", "time1": "12:04", "min1": 6,
                 "time2": "12:15", "min2": 17, "time3": "12:30", "min3": 32},
                {"no": "188", "time1": "12:06", "min1": "8",
                 "time2": "12:21", "min2": "23", "time3": "--:--", "min3": ""}
            ]
        },
        "stop_b": {
            "name": "Boon Lay Interchange",
            "code": "45489",
            "services": [
                {"no": 52, "time1": "12:02", "min1": "Arr",
                 "time2": "12:13", "min2": 15, "time3": "12:27", "min3": 29}
            ]
        },
        "stop_c": {
            "code": "45371",
            "services": [
                {"no": "99", "min1": 4, "min2": 14, "min3": 27},
                {"no": "154", "min1": 7, "min2": 19, "min3": 33},
                {"no": "174", "min1": 11, "min2": 26, "min3": 41}
            ]
        }
    }"#
}

pub fn sample_payload() -> ArrivalPayload {
    ArrivalPayload::from_json(gas_document()).expect("fixture decodes")
}

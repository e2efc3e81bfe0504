use std::hint::black_box;
use std::time::Instant;

use busboard::{Arrival, ArrivalPayload, Eta, Route, Stop};
use busboard_embedded_graphics::{render_board, BoardOptions, EgTextMetrics};
use busboard_render::{plan_fitted, AutoFitConfig, BoardGeometry, FontSizes};

const WARMUP_ITERS: usize = 5;
const MEASURE_ITERS: usize = 50;

fn route(label: &str, minutes: [u32; 3]) -> Route {
    Route {
        label: label.to_string(),
        arrivals: minutes.map(|min| Arrival {
            at: Some(format!("12:{:02}", min % 60)),
            eta: Eta::Minutes(min),
        }),
    }
}

fn stop(name: &str, routes: Vec<Route>) -> Stop {
    Stop {
        name: Some(name.to_string()),
        code: "45379".to_string(),
        routes: routes.into_iter().collect(),
    }
}

fn fixture_payloads() -> Vec<(&'static str, ArrivalPayload)> {
    let simple = ArrivalPayload {
        stop_a: Some(stop("Science Centre", vec![route("307", [6, 17, 32])])),
        stop_b: Some(stop("Interchange", vec![route("188", [2, 9, 21])])),
        stop_c: Some(stop("Opp Library", vec![route("52", [4, 14, 27])])),
    };
    let busy = ArrivalPayload {
        stop_a: Some(stop(
            "Opposite the Northern Science and Discovery Centre Main Entrance",
            (0..5).map(|i| route(&format!("{}", 300 + i), [1, 12, 25])).collect(),
        )),
        stop_b: Some(stop(
            "Boon Lay Bus Interchange Berth B7 Alighting Only",
            (0..5).map(|i| route(&format!("{}", 180 + i), [3, 15, 28])).collect(),
        )),
        stop_c: Some(stop(
            "Opp Jurong Town Public Library and Community Club",
            (0..5).map(|i| route(&format!("{}", 50 + i), [5, 18, 31])).collect(),
        )),
    };
    vec![("simple", simple), ("busy", busy)]
}

fn bench<F: FnMut()>(name: &str, mut f: F) {
    for _ in 0..WARMUP_ITERS {
        f();
    }
    let start = Instant::now();
    for _ in 0..MEASURE_ITERS {
        f();
    }
    let elapsed = start.elapsed();
    println!(
        "{:<24} {:>8.3} ms/iter",
        name,
        elapsed.as_secs_f64() * 1e3 / MEASURE_ITERS as f64
    );
}

fn main() {
    let metrics = EgTextMetrics::new();
    let geometry = BoardGeometry::default();
    let sizes = FontSizes::default();
    let autofit = AutoFitConfig::default();
    let options = BoardOptions::default();

    for (name, payload) in fixture_payloads() {
        bench(&format!("plan/{}", name), || {
            let (plan, fit) = plan_fitted(
                &metrics,
                &payload,
                "Updated 12:04",
                sizes,
                &autofit,
                &geometry,
            );
            black_box((plan.commands.len(), fit.iterations));
        });
        bench(&format!("render/{}", name), || {
            let board =
                render_board(&payload, "Updated 12:04", &options).expect("bench render");
            black_box(board.png.len());
        });
    }
}

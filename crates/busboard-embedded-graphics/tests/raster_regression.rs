use busboard::{Arrival, ArrivalPayload, Eta, Route, Stop};
use busboard_embedded_graphics::{
    render_board, render_board_with_backend, BoardOptions, TtfFontBackend,
};
use busboard_render::TextRole;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

fn route(label: &str, arrivals: [Eta; 3]) -> Route {
    Route {
        label: label.to_string(),
        arrivals: arrivals.map(|eta| Arrival { at: None, eta }),
    }
}

fn stop(name: &str, code: &str, routes: Vec<Route>) -> Stop {
    Stop {
        name: Some(name.to_string()),
        code: code.to_string(),
        routes: routes.into_iter().collect(),
    }
}

fn sample_payload() -> ArrivalPayload {
    ArrivalPayload {
        stop_a: Some(stop(
            "Opp Science Centre",
            "45379",
            vec![route(
                "307",
                [Eta::Minutes(6), Eta::Minutes(17), Eta::Minutes(32)],
            )],
        )),
        stop_b: Some(stop(
            "Boon Lay Interchange",
            "45489",
            vec![route(
                "188",
                [Eta::Minutes(2), Eta::Minutes(9), Eta::Minutes(21)],
            )],
        )),
        stop_c: Some(stop(
            "Opp Town Library",
            "45371",
            vec![route(
                "52",
                [Eta::Minutes(4), Eta::Minutes(14), Eta::Minutes(27)],
            )],
        )),
    }
}

fn png_dimensions(png: &[u8]) -> (u32, u32) {
    // IHDR is the first chunk: width and height start at byte 16.
    let width = u32::from_be_bytes([png[16], png[17], png[18], png[19]]);
    let height = u32::from_be_bytes([png[20], png[21], png[22], png[23]]);
    (width, height)
}

#[test]
fn default_payload_renders_without_shrinking() {
    let options = BoardOptions::default();
    let board = render_board(&sample_payload(), "Updated 12:04", &options).expect("render");

    assert!(board.fit.fits);
    assert_eq!(board.fit.iterations, 0);
    assert!(!board.using_fallback_font());

    assert_eq!(&board.png[..8], &PNG_SIGNATURE);
    assert_eq!(
        png_dimensions(&board.png),
        (
            options.geometry.width as u32,
            options.geometry.height as u32
        )
    );
    assert!(board.bitmap.ink_count() > 0, "a populated board draws ink");
}

#[test]
fn missing_arrivals_draw_placeholder_glyphs() {
    let payload = ArrivalPayload {
        stop_a: Some(stop(
            "Quiet Stop",
            "1",
            vec![route("12", [Eta::Minutes(5), Eta::Unknown, Eta::Unknown])],
        )),
        ..ArrivalPayload::default()
    };
    let board = render_board(&payload, "Updated 12:04", &BoardOptions::default())
        .expect("render");

    // All three arrival fields are planned, the missing two as placeholders.
    let fields: Vec<&str> = board
        .plan
        .commands
        .iter()
        .filter(|cmd| cmd.role == TextRole::ArrivalTime)
        .map(|cmd| cmd.text.as_str())
        .collect();
    assert_eq!(fields, vec!["5 min", "\u{2014}", "\u{2014}"]);

    // The placeholder fields put actual ink on the canvas.
    for cmd in board
        .plan
        .commands
        .iter()
        .filter(|cmd| cmd.role == TextRole::ArrivalTime && cmd.text == "\u{2014}")
    {
        let mut ink = false;
        for dy in 0..20u32 {
            for dx in 0..12u32 {
                if board
                    .bitmap
                    .is_ink(cmd.x as u32 + dx, cmd.y as u32 + dy)
                {
                    ink = true;
                }
            }
        }
        assert!(ink, "placeholder at ({}, {}) drew nothing", cmd.x, cmd.y);
    }
}

#[test]
fn overflowing_payload_still_produces_an_image() {
    let long_name = "An Exceptionally Long Stop Name Engineered To Wrap Across Many Lines \
                     And Overflow A Small Canvas At Default Font Sizes";
    let payload = ArrivalPayload {
        stop_a: Some(stop(
            long_name,
            "1",
            (0..5)
                .map(|i| route(&i.to_string(), [Eta::Minutes(1); 3]))
                .collect(),
        )),
        stop_b: Some(stop(long_name, "2", vec![])),
        stop_c: Some(stop(long_name, "3", vec![])),
    };
    let mut options = BoardOptions::default();
    options.geometry.height = 160;

    let board = render_board(&payload, "Updated 12:04", &options).expect("render");
    assert!(board.fit.iterations >= 1);
    assert_eq!(&board.png[..8], &PNG_SIGNATURE);
    // Whether or not it converged, the raster has the canvas dimensions.
    assert_eq!(
        png_dimensions(&board.png),
        (options.geometry.width as u32, 160)
    );
}

#[test]
fn unregistered_ttf_backend_flags_fallback_but_renders() {
    let board = render_board_with_backend(
        &sample_payload(),
        "Updated 12:04",
        &BoardOptions::default(),
        TtfFontBackend::new(),
    )
    .expect("render");

    assert!(board.using_fallback_font());
    assert!(board.text_fallbacks.face_unavailable > 0);
    assert_eq!(&board.png[..8], &PNG_SIGNATURE);
    assert!(board.bitmap.ink_count() > 0);
}

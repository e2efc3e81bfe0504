use busboard::{ArrivalPayload, Route, Stop, StopSlot};
use log::debug;

use crate::render_ir::{
    AutoFitConfig, BlockLayout, BoardGeometry, BoardPlan, FitSummary, FontSizes, TextCommand,
    TextRole,
};

/// Text measurement hook used by all layout passes.
///
/// Implementations must be pure functions of their arguments for a fixed font
/// resource, so repeated measurement passes are deterministic. The
/// embedded-graphics backend provides the glyph-accurate implementation;
/// [`HeuristicMetrics`] is a dependency-free stand-in with the same shape.
pub trait TextMetrics: Send + Sync {
    /// Rendered width of `text` at the role's font, in pixels.
    fn text_width_px(&self, text: &str, role: TextRole, size_px: u32) -> i32;

    /// Line height for the role's font, in pixels.
    fn line_height_px(&self, role: TextRole, size_px: u32) -> i32;
}

/// Width model used when no font backend is wired in.
///
/// Per-glyph width classes scaled by the requested size. Coarse, but stable
/// and monotone in `size_px`, which is all the planner relies on.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeuristicMetrics;

impl TextMetrics for HeuristicMetrics {
    fn text_width_px(&self, text: &str, _role: TextRole, size_px: u32) -> i32 {
        let em_sum: f32 = text.chars().map(glyph_em_width).sum();
        (em_sum * size_px as f32).ceil() as i32
    }

    fn line_height_px(&self, _role: TextRole, size_px: u32) -> i32 {
        size_px.max(1) as i32
    }
}

fn glyph_em_width(ch: char) -> f32 {
    match ch {
        ' ' | '\u{00A0}' => 0.32,
        'i' | 'l' | 'I' | '|' | '!' => 0.24,
        '.' | ',' | ':' | ';' | '\'' | '"' | '`' => 0.23,
        '-' | '\u{2013}' | '\u{2014}' => 0.34,
        '(' | ')' | '[' | ']' => 0.30,
        'f' | 't' | 'j' | 'r' => 0.34,
        'm' | 'w' | 'M' | 'W' | '@' | '%' | '&' | '#' => 0.74,
        c if c.is_ascii_digit() => 0.52,
        c if c.is_ascii_uppercase() => 0.64,
        c if c.is_ascii_lowercase() => 0.52,
        c if c.is_whitespace() => 0.32,
        _ => 0.56,
    }
}

/// Greedy word wrap at a maximum pixel width.
///
/// Words accumulate onto the current line with a single separating space;
/// when the tentative line overflows, the current line is flushed and the
/// word starts a new one. A single word wider than `max_width_px` is placed
/// alone on its own line, never split or truncated. Empty input produces no
/// lines. Deterministic: identical inputs yield identical output.
pub fn wrap_text(
    metrics: &dyn TextMetrics,
    text: &str,
    role: TextRole,
    size_px: u32,
    max_width_px: i32,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        if line.is_empty() {
            line.push_str(word);
            continue;
        }
        let tentative_width = metrics.text_width_px(&line, role, size_px)
            + metrics.text_width_px(" ", role, size_px)
            + metrics.text_width_px(word, role, size_px);
        if tentative_width > max_width_px {
            lines.push(core::mem::take(&mut line));
            line.push_str(word);
        } else {
            line.push(' ');
            line.push_str(word);
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Title shown for a block: stop display name, falling back to the slot label
/// when the slot is absent or entirely blank.
pub fn block_title<'a>(stop: Option<&'a Stop>, slot: StopSlot) -> &'a str {
    stop.and_then(Stop::display_name)
        .unwrap_or_else(|| slot.fallback_title())
}

/// Measure one block without drawing: wrapped title, uniform row advance,
/// total height.
///
/// Only the first `max_routes` routes count; extras are silently dropped.
/// Every kept row reserves the same height (three arrival lines plus gaps
/// plus row padding) regardless of how many of its arrival slots are
/// populated, so partially filled rows keep the vertical rhythm.
pub fn measure_block(
    metrics: &dyn TextMetrics,
    title: &str,
    route_count: usize,
    sizes: &FontSizes,
    geom: &BoardGeometry,
    column_width: i32,
    max_routes: usize,
) -> BlockLayout {
    let title_lines = wrap_text(metrics, title, TextRole::Title, sizes.title, column_width);
    let title_line_height = metrics.line_height_px(TextRole::Title, sizes.title);
    let title_height = title_lines.len() as i32 * title_line_height + geom.title_gap;

    let arrival_line_height = metrics.line_height_px(TextRole::ArrivalTime, sizes.arrival);
    let row_height = 3 * arrival_line_height + 2 * sizes.line_gap + geom.row_padding;

    let rows = route_count.min(max_routes);
    BlockLayout {
        height: title_height + rows as i32 * row_height,
        title_lines,
        title_height,
        row_height,
        rows,
    }
}

/// Plan the full board for one font-size configuration.
///
/// Fixed template: the header text right-aligned at the top, stop A and B in
/// two equal columns beneath it, stop C spanning the full content width below
/// the taller of the two with its first routes in side-by-side sub-columns.
/// Performs metric queries only, no drawing, so the auto-fit controller can
/// call it every iteration.
pub fn plan_board(
    metrics: &dyn TextMetrics,
    payload: &ArrivalPayload,
    header_text: &str,
    sizes: &FontSizes,
    geom: &BoardGeometry,
) -> BoardPlan {
    let mut commands = Vec::with_capacity(32);

    let header_height = metrics.line_height_px(TextRole::Header, sizes.header);
    if !header_text.is_empty() {
        let header_width = metrics.text_width_px(header_text, TextRole::Header, sizes.header);
        commands.push(TextCommand {
            x: geom.width - geom.margin_right - header_width,
            y: geom.margin_top,
            text: header_text.to_string(),
            role: TextRole::Header,
            size_px: sizes.header,
        });
    }

    let blocks_top = geom.margin_top + header_height + geom.header_gap;
    let column_width = geom.column_width();
    let left_x = geom.margin_left;
    let right_x = geom.margin_left + column_width + geom.column_gap;

    let bottom_a = emit_stacked_block(
        &mut commands,
        metrics,
        payload.stop(StopSlot::A),
        StopSlot::A,
        sizes,
        geom,
        left_x,
        blocks_top,
        column_width,
    );
    let bottom_b = emit_stacked_block(
        &mut commands,
        metrics,
        payload.stop(StopSlot::B),
        StopSlot::B,
        sizes,
        geom,
        right_x,
        blocks_top,
        column_width,
    );

    let c_top = bottom_a.max(bottom_b) + geom.block_gap;
    let c_bottom = emit_wide_block(
        &mut commands,
        metrics,
        payload.stop(StopSlot::C),
        sizes,
        geom,
        c_top,
    );

    BoardPlan {
        commands,
        content_height: c_bottom + geom.margin_bottom,
        sizes: *sizes,
    }
}

/// Emit a top block: wrapped title, then up to `max_routes_top` rows stacked
/// vertically. Returns the block's bottom edge.
#[allow(clippy::too_many_arguments)]
fn emit_stacked_block(
    commands: &mut Vec<TextCommand>,
    metrics: &dyn TextMetrics,
    stop: Option<&Stop>,
    slot: StopSlot,
    sizes: &FontSizes,
    geom: &BoardGeometry,
    x0: i32,
    y0: i32,
    column_width: i32,
) -> i32 {
    let title = block_title(stop, slot);
    let routes = stop.map(|s| s.routes.as_slice()).unwrap_or(&[]);
    let layout = measure_block(
        metrics,
        title,
        routes.len(),
        sizes,
        geom,
        column_width,
        geom.max_routes_top,
    );

    let mut y = emit_title(commands, metrics, &layout, sizes, x0, y0);
    y += geom.title_gap;
    for route in &routes[..layout.rows] {
        emit_route_row(commands, metrics, route, sizes, geom, x0, y);
        y += layout.row_height;
    }
    y0 + layout.height
}

/// Emit the bottom block: full-width title, then the first
/// `max_routes_bottom` routes side by side in equal sub-columns. Returns the
/// block's bottom edge.
fn emit_wide_block(
    commands: &mut Vec<TextCommand>,
    metrics: &dyn TextMetrics,
    stop: Option<&Stop>,
    sizes: &FontSizes,
    geom: &BoardGeometry,
    y0: i32,
) -> i32 {
    let title = block_title(stop, StopSlot::C);
    let routes = stop.map(|s| s.routes.as_slice()).unwrap_or(&[]);
    let layout = measure_block(
        metrics,
        title,
        routes.len(),
        sizes,
        geom,
        geom.content_width(),
        geom.max_routes_bottom,
    );

    let rows_y = emit_title(commands, metrics, &layout, sizes, geom.margin_left, y0) + geom.title_gap;
    let inner_width = geom.column_width();
    for (idx, route) in routes[..layout.rows].iter().enumerate() {
        let x = geom.margin_left + idx as i32 * (inner_width + geom.column_gap);
        emit_route_row(commands, metrics, route, sizes, geom, x, rows_y);
    }

    // The side-by-side sub-columns occupy a single row of vertical space.
    let rows_height = if layout.rows > 0 { layout.row_height } else { 0 };
    y0 + layout.title_height + rows_height
}

/// Emit wrapped title lines; returns the y just below the last line.
fn emit_title(
    commands: &mut Vec<TextCommand>,
    metrics: &dyn TextMetrics,
    layout: &BlockLayout,
    sizes: &FontSizes,
    x: i32,
    y0: i32,
) -> i32 {
    let line_height = metrics.line_height_px(TextRole::Title, sizes.title);
    let mut y = y0;
    for line in &layout.title_lines {
        commands.push(TextCommand {
            x,
            y,
            text: line.clone(),
            role: TextRole::Title,
            size_px: sizes.title,
        });
        y += line_height;
    }
    y
}

/// Emit one route row: the label in its fixed-width column, then the three
/// arrival fields stacked to its right. Missing arrival slots render the
/// placeholder glyph so later fields never shift upward.
fn emit_route_row(
    commands: &mut Vec<TextCommand>,
    metrics: &dyn TextMetrics,
    route: &Route,
    sizes: &FontSizes,
    geom: &BoardGeometry,
    x: i32,
    y: i32,
) {
    commands.push(TextCommand {
        x,
        y,
        text: route.label.clone(),
        role: TextRole::RouteLabel,
        size_px: sizes.route_label,
    });

    let line_height = metrics.line_height_px(TextRole::ArrivalTime, sizes.arrival);
    let field_x = x + geom.label_col_width;
    for (idx, arrival) in route.arrivals.iter().enumerate() {
        commands.push(TextCommand {
            x: field_x,
            y: y + idx as i32 * (line_height + sizes.line_gap),
            text: arrival.label(),
            role: TextRole::ArrivalTime,
            size_px: sizes.arrival,
        });
    }
}

/// Resolve font sizes that fit the canvas, shrinking within bounds.
///
/// Starting from `initial`, the planner is re-run until the content fits the
/// canvas height. Each failed pass derives a shrink factor from the overflow
/// ratio, clamps it to the configured range, and produces a new smaller
/// `FontSizes` (per-role floors enforced). After `max_iterations` failed
/// attempts, or once every role sits at its floor, the last sizes are
/// returned regardless of fit: a slightly clipped board beats no board.
pub fn fit_sizes(
    metrics: &dyn TextMetrics,
    payload: &ArrivalPayload,
    header_text: &str,
    initial: FontSizes,
    autofit: &AutoFitConfig,
    geom: &BoardGeometry,
) -> (FontSizes, FitSummary) {
    let mut sizes = initial;
    let mut iterations = 0u32;

    loop {
        let plan = plan_board(metrics, payload, header_text, &sizes, geom);
        let content_height = plan.content_height;
        if content_height <= geom.height {
            return (
                sizes,
                FitSummary {
                    iterations,
                    fits: true,
                    content_height,
                },
            );
        }
        if iterations >= autofit.max_iterations {
            debug!(
                "auto-fit budget exhausted: content_height={} canvas_height={}",
                content_height, geom.height
            );
            return (
                sizes,
                FitSummary {
                    iterations,
                    fits: false,
                    content_height,
                },
            );
        }

        let factor = (geom.height as f32 / content_height as f32)
            .clamp(autofit.min_shrink, autofit.max_shrink);
        let next = sizes.shrunk(factor, &autofit.floors);
        if next == sizes {
            // Every role is at its floor; further iterations cannot help.
            debug!(
                "auto-fit floored at iteration {}: content_height={}",
                iterations, content_height
            );
            return (
                sizes,
                FitSummary {
                    iterations,
                    fits: false,
                    content_height,
                },
            );
        }
        debug!(
            "auto-fit iteration {}: content_height={} factor={:.3}",
            iterations, content_height, factor
        );
        sizes = next;
        iterations += 1;
    }
}

/// Full measurement pipeline: auto-fit, then the final plan.
pub fn plan_fitted(
    metrics: &dyn TextMetrics,
    payload: &ArrivalPayload,
    header_text: &str,
    initial: FontSizes,
    autofit: &AutoFitConfig,
    geom: &BoardGeometry,
) -> (BoardPlan, FitSummary) {
    let (sizes, summary) = fit_sizes(metrics, payload, header_text, initial, autofit, geom);
    let plan = plan_board(metrics, payload, header_text, &sizes, geom);
    (plan, summary)
}

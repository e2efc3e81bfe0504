use serde::{Deserialize, Serialize};

/// Text roles drawn on the board, each with an independent font size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextRole {
    /// Stop title above a block.
    Title,
    /// Route number in the fixed-width left column of a row.
    RouteLabel,
    /// One of the three stacked arrival fields.
    ArrivalTime,
    /// "Updated HH:MM" header in the top-right corner.
    Header,
}

/// Per-role font sizes in pixels plus the inter-line gap.
///
/// This is an immutable value: the auto-fit controller produces a new
/// `FontSizes` per shrink step rather than mutating shared state, so every
/// measurement pass sees one consistent configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontSizes {
    pub title: u32,
    pub route_label: u32,
    pub arrival: u32,
    pub header: u32,
    /// Vertical gap between stacked lines within a row, in pixels.
    pub line_gap: i32,
}

impl FontSizes {
    /// Size for a role.
    pub fn size_for(&self, role: TextRole) -> u32 {
        match role {
            TextRole::Title => self.title,
            TextRole::RouteLabel => self.route_label,
            TextRole::ArrivalTime => self.arrival,
            TextRole::Header => self.header,
        }
    }

    /// Apply a multiplicative shrink factor to every role.
    ///
    /// Each role is floored at its configured minimum and, while above the
    /// floor, decreases by at least one pixel so a factor close to 1.0 still
    /// makes progress. Sizes already at or below their floor are unchanged.
    pub fn shrunk(&self, factor: f32, floors: &FontSizes) -> FontSizes {
        FontSizes {
            title: shrink_size(self.title, factor, floors.title),
            route_label: shrink_size(self.route_label, factor, floors.route_label),
            arrival: shrink_size(self.arrival, factor, floors.arrival),
            header: shrink_size(self.header, factor, floors.header),
            line_gap: shrink_gap(self.line_gap, factor, floors.line_gap),
        }
    }
}

impl Default for FontSizes {
    fn default() -> Self {
        Self {
            title: 22,
            route_label: 18,
            arrival: 16,
            header: 13,
            line_gap: 4,
        }
    }
}

fn shrink_size(size: u32, factor: f32, floor: u32) -> u32 {
    if size <= floor {
        return size;
    }
    let scaled = (size as f32 * factor).floor() as u32;
    scaled.min(size - 1).max(floor)
}

fn shrink_gap(gap: i32, factor: f32, floor: i32) -> i32 {
    if gap <= floor {
        return gap;
    }
    let scaled = (gap as f32 * factor).floor() as i32;
    scaled.min(gap - 1).max(floor)
}

/// Auto-fit policy: shrink clamp, per-role floors, iteration budget.
///
/// The numeric defaults are tuned empirically, not load-bearing; callers may
/// override any of them.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AutoFitConfig {
    /// Minimum size per role; no shrink step goes below these.
    pub floors: FontSizes,
    /// Lower clamp on the shrink factor (guards against single-step collapse).
    pub min_shrink: f32,
    /// Upper clamp on the shrink factor (guards against no-op shrinkage).
    pub max_shrink: f32,
    /// Maximum shrink iterations before the overflow is accepted.
    pub max_iterations: u32,
}

impl Default for AutoFitConfig {
    fn default() -> Self {
        Self {
            floors: FontSizes {
                title: 13,
                route_label: 10,
                arrival: 9,
                header: 8,
                line_gap: 2,
            },
            min_shrink: 0.72,
            max_shrink: 0.98,
            max_iterations: 8,
        }
    }
}

/// Fixed board geometry: canvas size, padding, and the block template.
///
/// The template itself (two top blocks side by side, one full-width bottom
/// block) is not configurable; only its pixel dimensions are.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardGeometry {
    /// Canvas width in pixels.
    pub width: i32,
    /// Canvas height in pixels.
    pub height: i32,
    pub margin_left: i32,
    pub margin_right: i32,
    pub margin_top: i32,
    pub margin_bottom: i32,
    /// Horizontal gap between the two columns (outer and inner).
    pub column_gap: i32,
    /// Vertical gap between the header line and the top blocks.
    pub header_gap: i32,
    /// Vertical gap between a block title and its first row.
    pub title_gap: i32,
    /// Extra vertical padding after each route row.
    pub row_padding: i32,
    /// Vertical gap between the top blocks and the bottom block.
    pub block_gap: i32,
    /// Fixed width of the route-label column within a row.
    pub label_col_width: i32,
    /// Routes shown per top block; extras are silently dropped.
    pub max_routes_top: usize,
    /// Routes shown in the bottom block's side-by-side sub-columns.
    pub max_routes_bottom: usize,
}

impl BoardGeometry {
    /// Horizontal content width inside the margins.
    pub fn content_width(&self) -> i32 {
        (self.width - self.margin_left - self.margin_right).max(1)
    }

    /// Width of one of the two equal columns.
    pub fn column_width(&self) -> i32 {
        ((self.content_width() - self.column_gap) / 2).max(1)
    }
}

impl Default for BoardGeometry {
    fn default() -> Self {
        Self {
            width: 800,
            height: 480,
            margin_left: 20,
            margin_right: 20,
            margin_top: 6,
            margin_bottom: 10,
            column_gap: 30,
            header_gap: 8,
            title_gap: 6,
            row_padding: 6,
            block_gap: 12,
            label_col_width: 90,
            max_routes_top: 3,
            max_routes_bottom: 2,
        }
    }
}

/// One positioned text element.
///
/// `x`/`y` are the top-left corner of the first glyph cell; alignment
/// decisions (the right-aligned header) are resolved at plan time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextCommand {
    pub x: i32,
    pub y: i32,
    pub text: String,
    pub role: TextRole,
    pub size_px: u32,
}

/// Measured geometry of one block, computed without drawing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlockLayout {
    /// Wrapped title lines for the block's column width.
    pub title_lines: Vec<String>,
    /// Title lines plus the title gap.
    pub title_height: i32,
    /// Vertical advance per route row (uniform regardless of populated slots).
    pub row_height: i32,
    /// Route rows kept after truncation.
    pub rows: usize,
    /// Total block height.
    pub height: i32,
}

/// Outcome of one auto-fit resolution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    /// Shrink iterations performed (0 when the initial sizes fit).
    pub iterations: u32,
    /// Whether the final plan fits the canvas height.
    pub fits: bool,
    /// Content height of the final plan, including bottom padding.
    pub content_height: i32,
}

/// Finalized plan: every text element positioned, ready to rasterize.
///
/// Ephemeral: produced once per render pass and consumed immediately.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardPlan {
    pub commands: Vec<TextCommand>,
    /// Bottom edge of the bottom block plus bottom padding.
    pub content_height: i32,
    /// Sizes the plan was computed with.
    pub sizes: FontSizes,
}

impl BoardPlan {
    /// Whether the planned content fits within a canvas of the given height.
    pub fn fits(&self, canvas_height: i32) -> bool {
        self.content_height <= canvas_height
    }
}

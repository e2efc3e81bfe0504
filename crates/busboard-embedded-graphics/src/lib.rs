//! embedded-graphics rasterizer for `busboard-render` plans.
//!
//! Text is drawn into a grayscale working surface ([`GrayFrame`]) through a
//! [`FontBackend`], quantized to 1 bit per pixel with a hard threshold, then
//! PNG-encoded. No dithering: near-identical renders must stay stable
//! frame-to-frame on a slow-refresh e-paper panel. The whole pipeline
//! (measure, fit, draw, quantize, encode) lives in [`render_board`].

#![cfg_attr(
    not(test),
    deny(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::todo,
        clippy::unimplemented
    )
)]

use core::convert::Infallible;
use core::fmt;
use std::borrow::Cow;

use busboard::ArrivalPayload;
use busboard_render::{
    plan_fitted, AutoFitConfig, BoardGeometry, BoardPlan, FitSummary, FontSizes, TextMetrics,
    TextRole,
};
use embedded_graphics::{
    mono_font::{
        ascii::{
            FONT_10X20, FONT_4X6, FONT_5X7, FONT_5X8, FONT_6X10, FONT_6X12, FONT_6X13_BOLD,
            FONT_6X9, FONT_7X13, FONT_7X14, FONT_7X14_BOLD, FONT_9X15, FONT_9X15_BOLD, FONT_9X18,
            FONT_9X18_BOLD,
        },
        MonoFont, MonoTextStyle,
    },
    pixelcolor::Gray8,
    prelude::*,
    text::{Baseline, Text},
};
use image::{codecs::png::PngEncoder, ExtendedColorType, ImageEncoder};

/// Backend-local font identifier used for metrics and rasterization dispatch.
pub type FontId = u8;

const BOLD_BIT: FontId = 0b1000_0000;
const TTF_BIT: FontId = 0b0100_0000;
const ROLE_MASK: FontId = 0b0011_0000;
const ROLE_SHIFT: FontId = 4;
const INDEX_MASK: FontId = 0b0000_1111;

/// Why font resolution had to fall back from the requested resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontFallbackReason {
    /// No face registered (or parsable) for the requested role.
    FaceUnavailable,
    /// Requested pixel size lies outside the built-in face ladder.
    SizeOutOfRange,
    /// Font id did not decode to a known face.
    UnknownFontId,
}

/// Resolved font selection for a text role at a size.
///
/// The tagged `fallback_reason` is the "using fallback" signal: a render is
/// never aborted for a missing font, the reason is surfaced instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FontSelection {
    pub font_id: FontId,
    pub fallback_reason: Option<FontFallbackReason>,
}

/// Metrics for a resolved font at a concrete pixel size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceMetrics {
    /// Advance per glyph cell.
    pub char_width: i32,
    /// Vertical advance per line.
    pub line_height: i32,
}

/// TTF face registration descriptor, one face per text role.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FontFaceRegistration<'a> {
    pub role: TextRole,
    pub data: &'a [u8],
}

/// Font abstraction used by the renderer's text paths.
pub trait FontBackend {
    /// Register TTF faces; returns how many were accepted.
    fn register_faces(&mut self, faces: &[FontFaceRegistration<'_>]) -> usize;

    /// Resolve a font for a role at a pixel size.
    fn resolve_font(&self, role: TextRole, size_px: u32) -> FontSelection;

    /// Metrics for a resolved font id at the requested size.
    fn metrics(&self, font_id: FontId, size_px: u32) -> FaceMetrics;

    /// Draw one text run; returns the advance in pixels.
    fn draw_text_run<D>(
        &self,
        display: &mut D,
        font_id: FontId,
        text: &str,
        origin: Point,
    ) -> Result<i32, D::Error>
    where
        D: DrawTarget<Color = Gray8>;
}

/// Built-in reference backend: the embedded-graphics mono font ladder.
///
/// Each role maps onto the largest face whose glyph height fits the requested
/// size, so shrinking sizes during auto-fit walks down the ladder
/// monotonically. Titles use the bold faces.
#[derive(Clone, Copy, Debug, Default)]
pub struct MonoFontBackend;

const REGULAR_LADDER: [&MonoFont<'static>; 11] = [
    &FONT_4X6,
    &FONT_5X7,
    &FONT_5X8,
    &FONT_6X9,
    &FONT_6X10,
    &FONT_6X12,
    &FONT_7X13,
    &FONT_7X14,
    &FONT_9X15,
    &FONT_9X18,
    &FONT_10X20,
];

const BOLD_LADDER: [&MonoFont<'static>; 4] = [
    &FONT_6X13_BOLD,
    &FONT_7X14_BOLD,
    &FONT_9X15_BOLD,
    &FONT_9X18_BOLD,
];

impl MonoFontBackend {
    fn ladder_for(role: TextRole) -> (&'static [&'static MonoFont<'static>], bool) {
        match role {
            TextRole::Title => (&BOLD_LADDER, true),
            _ => (&REGULAR_LADDER, false),
        }
    }

    /// Largest ladder index whose glyph height fits `size_px`.
    ///
    /// A request above the ladder quietly uses the largest face (ordinary
    /// quantization during auto-fit); a request below the smallest face is
    /// clamped upward and flagged, since the result is larger than asked for.
    fn ladder_index(ladder: &[&MonoFont<'static>], size_px: u32) -> (usize, bool) {
        let mut chosen = 0usize;
        let clamped = size_px < ladder[0].character_size.height;
        for (idx, font) in ladder.iter().enumerate() {
            if font.character_size.height <= size_px {
                chosen = idx;
            }
        }
        (chosen, clamped)
    }

    fn encode_font_id(bold: bool, index: usize) -> FontId {
        let bold_bit = if bold { BOLD_BIT } else { 0 };
        bold_bit | (index as FontId & INDEX_MASK)
    }

    fn font_for(font_id: FontId) -> (&'static MonoFont<'static>, Option<FontFallbackReason>) {
        let index = (font_id & INDEX_MASK) as usize;
        let ladder: &[&MonoFont<'static>] = if font_id & BOLD_BIT != 0 {
            &BOLD_LADDER
        } else {
            &REGULAR_LADDER
        };
        match ladder.get(index) {
            Some(font) => (font, None),
            None => (
                ladder[ladder.len() - 1],
                Some(FontFallbackReason::UnknownFontId),
            ),
        }
    }
}

impl FontBackend for MonoFontBackend {
    fn register_faces(&mut self, _faces: &[FontFaceRegistration<'_>]) -> usize {
        0
    }

    fn resolve_font(&self, role: TextRole, size_px: u32) -> FontSelection {
        let (ladder, bold) = Self::ladder_for(role);
        let (index, clamped) = Self::ladder_index(ladder, size_px);
        FontSelection {
            font_id: Self::encode_font_id(bold, index),
            fallback_reason: clamped.then_some(FontFallbackReason::SizeOutOfRange),
        }
    }

    fn metrics(&self, font_id: FontId, _size_px: u32) -> FaceMetrics {
        let (font, _) = Self::font_for(font_id);
        FaceMetrics {
            char_width: font.character_size.width as i32,
            line_height: font.character_size.height as i32,
        }
    }

    fn draw_text_run<D>(
        &self,
        display: &mut D,
        font_id: FontId,
        text: &str,
        origin: Point,
    ) -> Result<i32, D::Error>
    where
        D: DrawTarget<Color = Gray8>,
    {
        let (font, _) = Self::font_for(font_id);
        let style = MonoTextStyle::new(font, Gray8::new(0x00));
        let normalized = normalize_text_for_mono(text);
        Text::with_baseline(normalized.as_ref(), origin, style, Baseline::Top).draw(display)?;
        Ok(normalized.chars().count() as i32 * font.character_size.width as i32)
    }
}

/// Replace glyphs outside the ASCII mono font repertoire.
fn normalize_text_for_mono(text: &str) -> Cow<'_, str> {
    if text.is_ascii() {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\u{00A0}' => out.push(' '),
            '\u{2013}' | '\u{2014}' => out.push('-'),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2026}' => out.push_str("..."),
            c if c.is_ascii() => out.push(c),
            _ => out.push('?'),
        }
    }
    Cow::Owned(out)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct TtfFaceMetrics {
    units_per_em: u16,
    avg_advance: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct TtfFaceEntry {
    metrics: TtfFaceMetrics,
}

/// Metrics-backed TTF backend with mono draw surrogates.
///
/// Registered faces contribute glyph-accurate-ish advance widths (scaled from
/// the face's `OS/2`/`hhea` average advance); drawing routes through the mono
/// ladder at the same size. A face that fails to parse, or a role with no
/// face, falls back to the built-in reference backend and flags it.
#[derive(Clone, Debug, Default)]
pub struct TtfFontBackend {
    mono: MonoFontBackend,
    faces: [Option<TtfFaceEntry>; 4],
}

fn role_index(role: TextRole) -> usize {
    match role {
        TextRole::Title => 0,
        TextRole::RouteLabel => 1,
        TextRole::ArrivalTime => 2,
        TextRole::Header => 3,
    }
}

impl TtfFontBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a usable face is registered for a role.
    pub fn has_face(&self, role: TextRole) -> bool {
        self.faces[role_index(role)].is_some()
    }
}

impl FontBackend for TtfFontBackend {
    fn register_faces(&mut self, faces: &[FontFaceRegistration<'_>]) -> usize {
        let mut accepted = 0usize;
        for face in faces {
            let Some(metrics) = parse_ttf_face_metrics(face.data) else {
                log::warn!(
                    "unparsable font face for role {:?}; mono fallback stays active",
                    face.role
                );
                continue;
            };
            self.faces[role_index(face.role)] = Some(TtfFaceEntry { metrics });
            accepted += 1;
        }
        accepted
    }

    fn resolve_font(&self, role: TextRole, size_px: u32) -> FontSelection {
        if self.faces[role_index(role)].is_none() {
            let mut selection = self.mono.resolve_font(role, size_px);
            selection.fallback_reason = Some(FontFallbackReason::FaceUnavailable);
            return selection;
        }
        // Encode the mono surrogate alongside the role so draw and metrics
        // both decode without a second resolution pass.
        let surrogate = self.mono.resolve_font(role, size_px);
        FontSelection {
            font_id: surrogate.font_id | TTF_BIT | ((role_index(role) as FontId) << ROLE_SHIFT),
            fallback_reason: None,
        }
    }

    fn metrics(&self, font_id: FontId, size_px: u32) -> FaceMetrics {
        if font_id & TTF_BIT != 0 {
            let role = ((font_id & ROLE_MASK) >> ROLE_SHIFT) as usize;
            if let Some(Some(face)) = self.faces.get(role) {
                return FaceMetrics {
                    char_width: scaled_advance_px(face.metrics, size_px),
                    line_height: size_px.max(1) as i32,
                };
            }
        }
        self.mono.metrics(font_id & !(TTF_BIT | ROLE_MASK), size_px)
    }

    fn draw_text_run<D>(
        &self,
        display: &mut D,
        font_id: FontId,
        text: &str,
        origin: Point,
    ) -> Result<i32, D::Error>
    where
        D: DrawTarget<Color = Gray8>,
    {
        self.mono
            .draw_text_run(display, font_id & !(TTF_BIT | ROLE_MASK), text, origin)
    }
}

fn scaled_advance_px(metrics: TtfFaceMetrics, size_px: u32) -> i32 {
    if metrics.units_per_em == 0 {
        return 1;
    }
    let units = metrics.avg_advance as i64 * size_px.max(1) as i64;
    let per_em = metrics.units_per_em as i64;
    ((units + per_em - 1) / per_em).max(1) as i32
}

/// Parse the sfnt tables needed for advance metrics.
fn parse_ttf_face_metrics(data: &[u8]) -> Option<TtfFaceMetrics> {
    let head = find_sfnt_table(data, *b"head")?;
    let units_per_em = be_u16(head, 18)?;
    if units_per_em == 0 {
        return None;
    }

    let mut avg_advance = find_sfnt_table(data, *b"OS/2")
        .and_then(|os2| be_i16(os2, 2))
        .filter(|width| *width > 0)
        .map(|width| width as u16)
        .unwrap_or(0);
    if avg_advance == 0 {
        avg_advance = find_sfnt_table(data, *b"hhea")
            .and_then(|hhea| be_u16(hhea, 10))
            .unwrap_or(0);
    }
    if avg_advance == 0 {
        avg_advance = ((units_per_em as u32 * 58) / 100).max(1) as u16;
    }

    Some(TtfFaceMetrics {
        units_per_em,
        avg_advance: avg_advance.max(1),
    })
}

fn find_sfnt_table(data: &[u8], tag: [u8; 4]) -> Option<&[u8]> {
    let num_tables = be_u16(data, 4)? as usize;
    let directory_len = 12usize.checked_add(num_tables.checked_mul(16)?)?;
    if directory_len > data.len() {
        return None;
    }
    for idx in 0..num_tables {
        let record_offset = 12 + idx * 16;
        let record_tag = data.get(record_offset..record_offset + 4)?;
        if record_tag != tag {
            continue;
        }
        let table_offset = be_u32(data, record_offset + 8)? as usize;
        let table_length = be_u32(data, record_offset + 12)? as usize;
        let table_end = table_offset.checked_add(table_length)?;
        if table_end > data.len() {
            return None;
        }
        return data.get(table_offset..table_end);
    }
    None
}

fn be_u16(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

fn be_i16(data: &[u8], offset: usize) -> Option<i16> {
    let bytes = data.get(offset..offset + 2)?;
    Some(i16::from_be_bytes([bytes[0], bytes[1]]))
}

fn be_u32(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// `TextMetrics` adapter backed by a [`FontBackend`].
///
/// Wiring the same backend into measurement and drawing keeps wrap decisions
/// consistent with what the rasterizer actually advances.
#[derive(Clone, Debug, Default)]
pub struct EgTextMetrics<B = MonoFontBackend> {
    backend: B,
}

impl EgTextMetrics<MonoFontBackend> {
    /// Measurer over the built-in reference backend.
    pub fn new() -> Self {
        Self {
            backend: MonoFontBackend,
        }
    }
}

impl<B> EgTextMetrics<B>
where
    B: FontBackend,
{
    /// Measurer over an explicit backend.
    pub fn with_backend(backend: B) -> Self {
        Self { backend }
    }
}

impl<B> TextMetrics for EgTextMetrics<B>
where
    B: FontBackend + Send + Sync,
{
    fn text_width_px(&self, text: &str, role: TextRole, size_px: u32) -> i32 {
        let selection = self.backend.resolve_font(role, size_px);
        let metrics = self.backend.metrics(selection.font_id, size_px);
        let normalized = normalize_text_for_mono(text);
        normalized.chars().count() as i32 * metrics.char_width
    }

    fn line_height_px(&self, role: TextRole, size_px: u32) -> i32 {
        let selection = self.backend.resolve_font(role, size_px);
        self.backend.metrics(selection.font_id, size_px).line_height
    }
}

/// Grayscale working surface the rasterizer draws into.
///
/// White background, black ink; quantized to 1 bit after drawing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayFrame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl GrayFrame {
    /// Blank (all-white) frame.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0xFF; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Luma at a pixel; out-of-bounds reads as white.
    pub fn luma(&self, x: u32, y: u32) -> u8 {
        if x >= self.width || y >= self.height {
            return 0xFF;
        }
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Hard-threshold quantization to a packed 1-bit bitmap.
    ///
    /// A pixel darker than `threshold` becomes ink. No error diffusion: a
    /// dithered board would flicker between near-identical refreshes.
    pub fn quantize(&self, threshold: u8) -> MonoBitmap {
        let total_bits = self.width as usize * self.height as usize;
        let mut bits = vec![0u8; total_bits.div_ceil(8)];
        for (idx, luma) in self.data.iter().enumerate() {
            if *luma < threshold {
                bits[idx / 8] |= 1 << (7 - (idx % 8));
            }
        }
        MonoBitmap {
            width: self.width,
            height: self.height,
            bits,
        }
    }
}

impl OriginDimensions for GrayFrame {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for GrayFrame {
    type Color = Gray8;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x < 0 || point.y < 0 {
                continue;
            }
            let (x, y) = (point.x as u32, point.y as u32);
            if x >= self.width || y >= self.height {
                continue;
            }
            self.data[y as usize * self.width as usize + x as usize] = color.luma();
        }
        Ok(())
    }
}

/// Final 1-bit raster in packed row-major bits (set bit = ink).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MonoBitmap {
    width: u32,
    height: u32,
    bits: Vec<u8>,
}

impl MonoBitmap {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether the pixel is ink (black). Out of bounds reads as paper.
    pub fn is_ink(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let bit_index = y as usize * self.width as usize + x as usize;
        (self.bits[bit_index / 8] >> (7 - (bit_index % 8))) & 0x01 == 1
    }

    /// Count of ink pixels, for tests and diagnostics.
    pub fn ink_count(&self) -> usize {
        self.bits.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Encode as a PNG still image (pure black/white luma).
    pub fn to_png(&self) -> Result<Vec<u8>, RenderBoardError> {
        let total = self.width as usize * self.height as usize;
        let mut luma = Vec::with_capacity(total);
        for idx in 0..total {
            let ink = (self.bits[idx / 8] >> (7 - (idx % 8))) & 0x01 == 1;
            luma.push(if ink { 0x00 } else { 0xFF });
        }
        let mut png = Vec::new();
        PngEncoder::new(&mut png).write_image(
            &luma,
            self.width,
            self.height,
            ExtendedColorType::L8,
        )?;
        Ok(png)
    }
}

/// Counters for font fallback reasons observed during a render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextFallbackDiagnostics {
    pub face_unavailable: u64,
    pub size_out_of_range: u64,
    pub unknown_font_id: u64,
}

impl TextFallbackDiagnostics {
    /// Total fallback count across all reasons.
    pub fn total(&self) -> u64 {
        self.face_unavailable
            .saturating_add(self.size_out_of_range)
            .saturating_add(self.unknown_font_id)
    }

    fn note_reason(&mut self, reason: FontFallbackReason) {
        match reason {
            FontFallbackReason::FaceUnavailable => {
                self.face_unavailable = self.face_unavailable.saturating_add(1);
            }
            FontFallbackReason::SizeOutOfRange => {
                self.size_out_of_range = self.size_out_of_range.saturating_add(1);
            }
            FontFallbackReason::UnknownFontId => {
                self.unknown_font_id = self.unknown_font_id.saturating_add(1);
            }
        }
    }
}

/// Plan executor for grayscale draw targets.
#[derive(Clone, Debug, Default)]
pub struct BoardRenderer<B = MonoFontBackend> {
    backend: B,
}

impl BoardRenderer<MonoFontBackend> {
    pub fn new() -> Self {
        Self {
            backend: MonoFontBackend,
        }
    }
}

impl<B> BoardRenderer<B>
where
    B: FontBackend,
{
    pub fn with_backend(backend: B) -> Self {
        Self { backend }
    }

    /// Draw every planned text element. Returns fallback diagnostics.
    pub fn render_plan<D>(
        &self,
        plan: &BoardPlan,
        display: &mut D,
    ) -> Result<TextFallbackDiagnostics, D::Error>
    where
        D: DrawTarget<Color = Gray8>,
    {
        let mut diagnostics = TextFallbackDiagnostics::default();
        for cmd in &plan.commands {
            let selection = self.backend.resolve_font(cmd.role, cmd.size_px);
            if let Some(reason) = selection.fallback_reason {
                diagnostics.note_reason(reason);
            }
            self.backend.draw_text_run(
                display,
                selection.font_id,
                &cmd.text,
                Point::new(cmd.x, cmd.y),
            )?;
        }
        Ok(diagnostics)
    }
}

/// Full-pipeline options.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoardOptions {
    pub geometry: BoardGeometry,
    pub sizes: FontSizes,
    pub autofit: AutoFitConfig,
    /// Quantization threshold: luma below this becomes ink.
    pub threshold: u8,
}

impl Default for BoardOptions {
    fn default() -> Self {
        Self {
            geometry: BoardGeometry::default(),
            sizes: FontSizes::default(),
            autofit: AutoFitConfig::default(),
            threshold: 0x80,
        }
    }
}

/// Output of one full render: encoded image plus diagnostics.
#[derive(Clone, Debug)]
pub struct RenderedBoard {
    pub png: Vec<u8>,
    pub bitmap: MonoBitmap,
    pub plan: BoardPlan,
    pub fit: FitSummary,
    pub text_fallbacks: TextFallbackDiagnostics,
}

impl RenderedBoard {
    /// True when any text fell back from the requested font resource.
    pub fn using_fallback_font(&self) -> bool {
        self.text_fallbacks.total() > 0
    }
}

/// Error from the render pipeline.
///
/// Layout and drawing are infallible by design; only image encoding can fail.
#[derive(Debug)]
pub enum RenderBoardError {
    PngEncode(image::ImageError),
}

impl fmt::Display for RenderBoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PngEncode(err) => write!(f, "png encode: {}", err),
        }
    }
}

impl std::error::Error for RenderBoardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::PngEncode(err) => Some(err),
        }
    }
}

impl From<image::ImageError> for RenderBoardError {
    fn from(err: image::ImageError) -> Self {
        Self::PngEncode(err)
    }
}

impl From<Infallible> for RenderBoardError {
    fn from(err: Infallible) -> Self {
        match err {}
    }
}

/// Render a payload end to end with the built-in reference fonts.
pub fn render_board(
    payload: &ArrivalPayload,
    header_text: &str,
    options: &BoardOptions,
) -> Result<RenderedBoard, RenderBoardError> {
    render_board_with_backend(payload, header_text, options, MonoFontBackend)
}

/// Render a payload end to end with an explicit font backend.
///
/// The same backend drives measurement and drawing. The pipeline never fails
/// for content reasons: oversized payloads produce a clipped board, missing
/// fonts produce a flagged fallback render.
pub fn render_board_with_backend<B>(
    payload: &ArrivalPayload,
    header_text: &str,
    options: &BoardOptions,
    backend: B,
) -> Result<RenderedBoard, RenderBoardError>
where
    B: FontBackend + Clone + Send + Sync,
{
    let metrics = EgTextMetrics::with_backend(backend.clone());
    let (plan, fit) = plan_fitted(
        &metrics,
        payload,
        header_text,
        options.sizes,
        &options.autofit,
        &options.geometry,
    );

    let mut frame = GrayFrame::new(options.geometry.width as u32, options.geometry.height as u32);
    let renderer = BoardRenderer::with_backend(backend);
    let text_fallbacks = renderer.render_plan(&plan, &mut frame)?;

    let bitmap = frame.quantize(options.threshold);
    let png = bitmap.to_png()?;
    Ok(RenderedBoard {
        png,
        bitmap,
        plan,
        fit,
        text_fallbacks,
    })
}

/// Plan a payload with backend-accurate metrics without drawing it.
///
/// Debug surface for the plan endpoint; mirrors what [`render_board`] would
/// draw at the same options.
pub fn plan_board_preview(
    payload: &ArrivalPayload,
    header_text: &str,
    options: &BoardOptions,
) -> (BoardPlan, FitSummary) {
    let metrics = EgTextMetrics::new();
    plan_fitted(
        &metrics,
        payload,
        header_text,
        options.sizes,
        &options.autofit,
        &options.geometry,
    )
}

//! Chart rendering for the sweep: a "Time" grid followed by a "Memory" grid,
//! three charts per row, one chart per benchmark, log scale on both axes.
//!
//! The grid is laid out as SVG and rasterized to PNG for posting.

use std::path::Path;

use resvg::{tiny_skia, usvg};

use crate::errors::SweepError;
use crate::stats::{BenchmarkSummary, SummaryTable};

pub const COLS: usize = 3;

const PANEL_W: f64 = 500.0;
const PANEL_H: f64 = 380.0;
const SECTION_H: f64 = 50.0;

const MARGIN_LEFT: f64 = 75.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 55.0;

const CAP_HALF_WIDTH: f64 = 5.0;

/// Series colors, cycled per implementation column.
const PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

/// Render every benchmark's time and memory charts into one SVG document.
pub fn render_chart_grid(summaries: &[BenchmarkSummary]) -> String {
    let grid_rows = summaries.len().div_ceil(COLS);
    let section_height = SECTION_H + grid_rows as f64 * PANEL_H;
    let width = COLS as f64 * PANEL_W;
    let height = 2.0 * section_height;

    let mut svg = String::new();
    svg.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.0}\" height=\"{height:.0}\" viewBox=\"0 0 {width:.0} {height:.0}\">\n"
    ));
    svg.push_str("  <style>\n");
    svg.push_str(
        "    text { font-family: \"DejaVu Sans\", \"Liberation Sans\", Arial, Helvetica, sans-serif; fill: #222; }\n",
    );
    svg.push_str("    .section { font-size: 20px; font-weight: bold; }\n");
    svg.push_str("    .title { font-size: 14px; }\n");
    svg.push_str("    .tick { font-size: 10px; }\n");
    svg.push_str("    .axis-label { font-size: 12px; }\n");
    svg.push_str("    .legend { font-size: 11px; }\n");
    svg.push_str("    .grid { stroke: #e0e0e0; stroke-width: 1; }\n");
    svg.push_str("  </style>\n");
    svg.push_str("  <rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n");

    let time: Vec<_> = summaries.iter().map(|s| (s.name.as_str(), &s.time)).collect();
    let memory: Vec<_> = summaries.iter().map(|s| (s.name.as_str(), &s.memory)).collect();

    render_section(&mut svg, "Time", "Time [s]", 0.0, &time);
    render_section(&mut svg, "Memory", "Memory [MB]", section_height, &memory);

    svg.push_str("</svg>\n");
    svg
}

/// Rasterize an SVG document to PNG bytes at its declared size.
pub fn rasterize(svg: &str) -> Result<Vec<u8>, SweepError> {
    let render_error = |detail: String| SweepError::ChartRender { detail };

    let mut options = usvg::Options::default();
    options.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &options).map_err(|e| render_error(e.to_string()))?;
    let size = tree.size().to_int_size();
    let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height()).ok_or_else(|| {
        render_error(format!("invalid canvas size {}x{}", size.width(), size.height()))
    })?;
    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

    pixmap.encode_png().map_err(|e| render_error(e.to_string()))
}

/// Write the chart to `path`: the SVG source for a `.svg` path, PNG otherwise.
pub fn write_chart(path: &Path, svg: &str) -> Result<(), SweepError> {
    let wants_svg = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));
    let bytes = if wants_svg {
        svg.as_bytes().to_vec()
    } else {
        rasterize(svg)?
    };

    std::fs::write(path, bytes).map_err(|source| SweepError::ChartWrite {
        path: path.to_path_buf(),
        source,
    })
}

fn render_section(
    svg: &mut String,
    heading: &str,
    y_label: &str,
    top: f64,
    charts: &[(&str, &SummaryTable)],
) {
    let center = COLS as f64 * PANEL_W / 2.0;
    svg.push_str(&format!(
        "  <text x=\"{center:.1}\" y=\"{:.1}\" text-anchor=\"middle\" class=\"section\">{heading}</text>\n",
        top + SECTION_H * 0.7
    ));

    // Slots past the last benchmark in the final row stay empty.
    for (i, (name, table)) in charts.iter().enumerate() {
        let x = (i % COLS) as f64 * PANEL_W;
        let y = top + SECTION_H + (i / COLS) as f64 * PANEL_H;
        render_panel(svg, x, y, name, table, y_label);
    }
}

/// Decade-aligned log10 axis.
#[derive(Debug, Clone, Copy, PartialEq)]
struct LogAxis {
    lo_exp: i32,
    hi_exp: i32,
    start_px: f64,
    end_px: f64,
}

impl LogAxis {
    fn fit(min: f64, max: f64, start_px: f64, end_px: f64) -> Self {
        let lo_exp = min.log10().floor() as i32;
        let mut hi_exp = max.log10().ceil() as i32;
        if hi_exp <= lo_exp {
            hi_exp = lo_exp + 1;
        }
        Self {
            lo_exp,
            hi_exp,
            start_px,
            end_px,
        }
    }

    fn floor_value(&self) -> f64 {
        10f64.powi(self.lo_exp)
    }

    fn to_px(&self, value: f64) -> f64 {
        let t = (value.log10() - self.lo_exp as f64) / (self.hi_exp - self.lo_exp) as f64;
        self.start_px + t * (self.end_px - self.start_px)
    }

    fn decades(&self) -> impl Iterator<Item = i32> {
        self.lo_exp..=self.hi_exp
    }
}

struct Point {
    x: f64,
    mean: f64,
    std_dev: f64,
}

fn render_panel(svg: &mut String, x: f64, y: f64, name: &str, table: &SummaryTable, y_label: &str) {
    let left = x + MARGIN_LEFT;
    let right = x + PANEL_W - MARGIN_RIGHT;
    let top = y + MARGIN_TOP;
    let bottom = y + PANEL_H - MARGIN_BOTTOM;

    svg.push_str(&format!(
        "  <text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\" class=\"title\">Benchmark - {}</text>\n",
        (left + right) / 2.0,
        y + MARGIN_TOP * 0.6,
        escape_xml(name)
    ));
    svg.push_str(&format!(
        "  <text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\" class=\"axis-label\">Number of requests</text>\n",
        (left + right) / 2.0,
        bottom + 40.0
    ));
    let label_x = x + 16.0;
    let label_y = (top + bottom) / 2.0;
    svg.push_str(&format!(
        "  <text x=\"{label_x:.1}\" y=\"{label_y:.1}\" text-anchor=\"middle\" class=\"axis-label\" transform=\"rotate(-90 {label_x:.1} {label_y:.1})\">{y_label}</text>\n"
    ));

    // Log scale: only points with a positive mean can be placed.
    let series: Vec<Vec<Point>> = (0..table.columns.len())
        .map(|c| {
            table
                .series(c)
                .filter(|(size, s)| !s.is_empty() && s.mean > 0.0 && *size > 0.0)
                .map(|(size, s)| Point {
                    x: size,
                    mean: s.mean,
                    std_dev: s.std_dev,
                })
                .collect()
        })
        .collect();

    let all = series.iter().flatten();
    let x_min = all.clone().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let x_max = all.clone().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
    let y_min = all
        .clone()
        .map(|p| if p.mean - p.std_dev > 0.0 { p.mean - p.std_dev } else { p.mean })
        .fold(f64::INFINITY, f64::min);
    let y_max = all.map(|p| p.mean + p.std_dev).fold(f64::NEG_INFINITY, f64::max);

    svg.push_str(&format!(
        "  <rect x=\"{left:.1}\" y=\"{top:.1}\" width=\"{:.1}\" height=\"{:.1}\" fill=\"none\" stroke=\"#333\"/>\n",
        right - left,
        bottom - top
    ));

    if !x_min.is_finite() || !y_min.is_finite() {
        svg.push_str(&format!(
            "  <text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\" class=\"legend\">no data</text>\n",
            (left + right) / 2.0,
            (top + bottom) / 2.0
        ));
        return;
    }

    let x_axis = LogAxis::fit(x_min, x_max, left, right);
    let y_axis = LogAxis::fit(y_min, y_max, bottom, top);

    for exp in x_axis.decades() {
        let px = x_axis.to_px(10f64.powi(exp));
        svg.push_str(&format!(
            "  <line x1=\"{px:.1}\" y1=\"{top:.1}\" x2=\"{px:.1}\" y2=\"{bottom:.1}\" class=\"grid\"/>\n"
        ));
        svg.push_str(&format!(
            "  <text x=\"{px:.1}\" y=\"{:.1}\" text-anchor=\"middle\" class=\"tick\">{}</text>\n",
            bottom + 15.0,
            format_decade(exp)
        ));
    }
    for exp in y_axis.decades() {
        let py = y_axis.to_px(10f64.powi(exp));
        svg.push_str(&format!(
            "  <line x1=\"{left:.1}\" y1=\"{py:.1}\" x2=\"{right:.1}\" y2=\"{py:.1}\" class=\"grid\"/>\n"
        ));
        svg.push_str(&format!(
            "  <text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"end\" class=\"tick\">{}</text>\n",
            left - 6.0,
            py + 3.5,
            format_decade(exp)
        ));
    }

    for (c, points) in series.iter().enumerate() {
        let color = PALETTE[c % PALETTE.len()];

        if points.len() > 1 {
            let coords: Vec<String> = points
                .iter()
                .map(|p| format!("{:.1},{:.1}", x_axis.to_px(p.x), y_axis.to_px(p.mean)))
                .collect();
            svg.push_str(&format!(
                "  <polyline points=\"{}\" fill=\"none\" stroke=\"{color}\" stroke-width=\"2\"/>\n",
                coords.join(" ")
            ));
        }

        for p in points {
            let px = x_axis.to_px(p.x);
            let lower = if p.mean - p.std_dev > 0.0 {
                p.mean - p.std_dev
            } else {
                y_axis.floor_value()
            };
            let y_lo = y_axis.to_px(lower);
            let y_hi = y_axis.to_px(p.mean + p.std_dev);
            svg.push_str(&format!(
                "  <line x1=\"{px:.1}\" y1=\"{y_lo:.1}\" x2=\"{px:.1}\" y2=\"{y_hi:.1}\" stroke=\"{color}\" stroke-width=\"1.5\"/>\n"
            ));
            for cap in [y_lo, y_hi] {
                svg.push_str(&format!(
                    "  <line x1=\"{:.1}\" y1=\"{cap:.1}\" x2=\"{:.1}\" y2=\"{cap:.1}\" stroke=\"{color}\" stroke-width=\"1.5\"/>\n",
                    px - CAP_HALF_WIDTH,
                    px + CAP_HALF_WIDTH
                ));
            }
            svg.push_str(&format!(
                "  <circle cx=\"{px:.1}\" cy=\"{:.1}\" r=\"2.5\" fill=\"{color}\"/>\n",
                y_axis.to_px(p.mean)
            ));
        }
    }

    for (c, implementation) in table.columns.iter().enumerate() {
        let color = PALETTE[c % PALETTE.len()];
        let ly = top + 14.0 + c as f64 * 16.0;
        svg.push_str(&format!(
            "  <line x1=\"{:.1}\" y1=\"{ly:.1}\" x2=\"{:.1}\" y2=\"{ly:.1}\" stroke=\"{color}\" stroke-width=\"2\"/>\n",
            left + 8.0,
            left + 28.0
        ));
        svg.push_str(&format!(
            "  <text x=\"{:.1}\" y=\"{:.1}\" class=\"legend\">{}</text>\n",
            left + 34.0,
            ly + 4.0,
            escape_xml(implementation.label())
        ));
    }
}

/// Tick label for `10^exp`.
fn format_decade(exp: i32) -> String {
    match exp {
        0..=5 => 10u64.pow(exp as u32).to_string(),
        -3..=-1 => 10f64.powi(exp).to_string(),
        _ => format!("1e{exp}"),
    }
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

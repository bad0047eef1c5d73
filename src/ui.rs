use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Line as CanvasLine, Rectangle},
        Axis, Bar, BarChart, BarGroup, Block, Borders, Chart, Dataset, GraphType, Paragraph,
    },
    Frame,
};
use crate::app::{App, AppState, Focus, RangeMode};
use crate::chart::{PriceFigure, PriceTrace, Rgb, VolumeFigure};
use crate::config::APP_TITLE;
use crate::metrics::{format_delta, format_usd, format_volume, PeriodMetrics};
use chrono::NaiveDate;

const SIDEBAR_WIDTH: u16 = 34;

pub fn render(f: &mut Frame, app: &App) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.area());

    render_header(f, app, layout[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
        .split(layout[1]);

    render_sidebar(f, app, body[0]);

    match app.state {
        AppState::Loading => render_loading(f, "Fetching market data...", body[1]),
        AppState::Dashboard => render_dashboard(f, app, body[1]),
    }

    render_footer(f, app, layout[2]);
}

fn tui_color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.0, rgb.1, rgb.2)
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled(format!(" {} ", APP_TITLE), Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(" | "),
        Span::styled(
            match app.state {
                AppState::Loading => "Loading",
                AppState::Dashboard => "Dashboard",
            },
            Style::default().fg(Color::Yellow),
        ),
    ];

    if let Some(output) = &app.output {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            format!("{} {}", output.instrument.symbol, format_usd(output.metrics.current_price)),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw(" "));
        spans.push(Span::styled(output.range.label.clone(), Style::default().fg(Color::Gray)));
    }

    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let hint = match app.focus {
        Focus::StartDate | Focus::EndDate => "Up/Down: field | Left/Right: -/+1 day (Shift: 30) | r: reload | q/Esc: quit",
        _ => "Up/Down: field | Left/Right: change | r: reload | q/Esc: quit",
    };

    let footer = Paragraph::new(Line::from(vec![
        Span::styled(" Controls: ", Style::default().fg(Color::Gray)),
        Span::styled(hint, Style::default().fg(Color::White)),
    ]))
    .block(Block::default().borders(Borders::ALL));

    f.render_widget(footer, area);
}

fn render_sidebar(f: &mut Frame, app: &App, area: Rect) {
    let c = &app.controls;
    let mut fields = vec![
        (Focus::Instrument, "Select Crypto Currency", c.instrument.display_name.to_string()),
        (Focus::ChartKind, "Select Chart Type", c.chart_kind.label().to_string()),
        (Focus::RangeMode, "Select Time Range Type", c.range_mode.label().to_string()),
    ];
    match c.range_mode {
        RangeMode::Predefined => fields.push((Focus::Period, "Time Period", c.period.label().to_string())),
        RangeMode::Custom => {
            fields.push((Focus::StartDate, "Start Date", c.custom_start.format("%Y-%m-%d").to_string()));
            fields.push((Focus::EndDate, "End Date", c.custom_end.format("%Y-%m-%d").to_string()));
        }
    }

    let mut lines = Vec::new();
    for (focus, label, value) in fields {
        let focused = focus == app.focus;
        lines.push(Line::from(Span::styled(label, Style::default().fg(Color::Gray))));
        let value_style = if focused {
            Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        lines.push(Line::from(vec![
            Span::raw(if focused { " < " } else { "   " }),
            Span::styled(value, value_style),
            Span::raw(if focused { " > " } else { "" }),
        ]));
        lines.push(Line::from(""));
    }

    if let Some(err) = &app.range_error {
        lines.push(Line::from(Span::styled(
            err.as_str(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
    }

    let sidebar = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Settings "));
    f.render_widget(sidebar, area);
}

fn render_loading(f: &mut Frame, msg: &str, area: Rect) {
    let block = Block::default().borders(Borders::ALL);
    let text = Paragraph::new(msg)
        .alignment(Alignment::Center)
        .block(block);
    f.render_widget(text, area);
}

fn render_dashboard(f: &mut Frame, app: &App, area: Rect) {
    let Some(output) = &app.output else {
        let (msg, color) = match (&app.error_msg, &app.range_error) {
            (Some(err), _) => (err.as_str(), Color::Red),
            (None, Some(_)) => ("Correct the date range in the sidebar to continue.", Color::Yellow),
            (None, None) => ("No data loaded.", Color::Gray),
        };
        let text = Paragraph::new(msg)
            .style(Style::default().fg(color))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(" Error "));
        f.render_widget(text, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Percentage(60),
            Constraint::Min(6),
        ])
        .split(area);

    render_metric_cards(f, &output.metrics, chunks[0]);
    match &output.price.trace {
        _ if output.price.is_empty() => f.render_widget(
            Paragraph::new("No bars to draw.")
                .alignment(Alignment::Center)
                .block(figure_block(&output.price.title)),
            chunks[1],
        ),
        PriceTrace::Candlestick { .. } => render_candles(f, &output.price, chunks[1]),
        PriceTrace::Line { .. } => render_price_line(f, &output.price, chunks[1]),
    }
    render_volume(f, &output.volume, chunks[2]);
}

fn render_metric_cards(f: &mut Frame, metrics: &PeriodMetrics, area: Rect) {
    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(25); 4])
        .split(area);

    let delta_line = |pct: Option<f64>| {
        let color = match pct {
            Some(p) if p >= 0.0 => Color::Green,
            Some(_) => Color::Red,
            None => Color::Gray,
        };
        Line::from(Span::styled(format_delta(pct), Style::default().fg(color)))
    };

    let entries = [
        ("Current Price", metrics.current_price, None),
        ("Starting Price", metrics.start_price, None),
        ("Period High", metrics.period_high, Some(delta_line(metrics.high_delta_pct()))),
        ("Period Low", metrics.period_low, Some(delta_line(metrics.low_delta_pct()))),
    ];

    for (area, (label, value, delta)) in cards.iter().zip(entries) {
        let mut lines = vec![Line::from(Span::styled(
            format_usd(value),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ))];
        if let Some(delta) = delta {
            lines.push(delta);
        }
        let card = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(format!(" {} ", label)));
        f.render_widget(card, *area);
    }
}

fn padded_bounds(fig: &PriceFigure) -> (f64, f64) {
    let (lo, hi) = fig.y_bounds().unwrap_or((0.0, 1.0));
    let pad = ((hi - lo) * 0.05).max(hi.abs() * 0.001).max(f64::EPSILON);
    (lo - pad, hi + pad)
}

fn date_labels(dates: &[NaiveDate]) -> Vec<Span<'static>> {
    let pick = |d: Option<&NaiveDate>| {
        Span::styled(
            d.map(|d| d.format("%b %d").to_string()).unwrap_or_default(),
            Style::default().fg(Color::Gray),
        )
    };
    vec![pick(dates.first()), pick(dates.get(dates.len() / 2)), pick(dates.last())]
}

fn price_labels(lo: f64, hi: f64) -> Vec<Span<'static>> {
    vec![
        Span::styled(format_usd(lo), Style::default().fg(Color::Gray)),
        Span::styled(format_usd(hi), Style::default().fg(Color::Gray)),
    ]
}

fn figure_block(title: &str) -> Block<'_> {
    Block::default()
        .title(Span::styled(
            title,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
}

fn render_candles(f: &mut Frame, fig: &PriceFigure, area: Rect) {
    let PriceTrace::Candlestick { candles, increasing, decreasing } = &fig.trace else {
        return;
    };
    let (lo, hi) = padded_bounds(fig);
    let n = candles.len() as f64;

    let canvas = Canvas::default()
        .block(figure_block(&fig.title))
        .marker(symbols::Marker::Braille)
        .x_bounds([-1.0, n])
        .y_bounds([lo, hi])
        .paint(|ctx| {
            for (i, candle) in candles.iter().enumerate() {
                let x = i as f64;
                let color = tui_color(if candle.is_increasing() { *increasing } else { *decreasing });
                ctx.draw(&CanvasLine {
                    x1: x,
                    y1: candle.low,
                    x2: x,
                    y2: candle.high,
                    color,
                });
                let body_lo = candle.open.min(candle.close);
                let body_hi = candle.open.max(candle.close);
                ctx.draw(&Rectangle {
                    x: x - 0.3,
                    y: body_lo,
                    width: 0.6,
                    height: body_hi - body_lo,
                    color,
                });
            }
            ctx.print(-1.0, hi, Span::styled(format_usd(hi), Style::default().fg(Color::Gray)));
            ctx.print(-1.0, lo, Span::styled(format_usd(lo), Style::default().fg(Color::Gray)));
        });

    f.render_widget(canvas, area);
}

fn render_price_line(f: &mut Frame, fig: &PriceFigure, area: Rect) {
    let PriceTrace::Line { points, color, .. } = &fig.trace else {
        return;
    };
    let data: Vec<(f64, f64)> = points
        .iter()
        .enumerate()
        .map(|(i, (_, close))| (i as f64, *close))
        .collect();
    let (lo, hi) = padded_bounds(fig);

    let datasets = vec![Dataset::default()
        .name("Close")
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(tui_color(*color)))
        .data(&data)];

    let chart = Chart::new(datasets)
        .block(figure_block(&fig.title))
        .x_axis(
            Axis::default()
                .title(fig.x_title)
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, (data.len().max(2) - 1) as f64])
                .labels(date_labels(&fig.dates())),
        )
        .y_axis(
            Axis::default()
                .title(fig.y_title)
                .style(Style::default().fg(Color::Gray))
                .bounds([lo, hi])
                .labels(price_labels(lo, hi)),
        );

    f.render_widget(chart, area);
}

/// Squeezes bars into `width` columns, keeping each bucket's peak.
fn fit_bars(values: &[u64], width: usize) -> Vec<u64> {
    if width == 0 {
        return Vec::new();
    }
    if values.len() <= width {
        return values.to_vec();
    }
    let chunk = values.len().div_ceil(width);
    values
        .chunks(chunk)
        .map(|c| c.iter().copied().max().unwrap_or(0))
        .collect()
}

fn render_volume(f: &mut Frame, fig: &VolumeFigure, area: Rect) {
    let values: Vec<u64> = fig.bars.iter().map(|(_, v)| *v).collect();
    let inner_width = area.width.saturating_sub(2) as usize;
    let bars: Vec<Bar> = fit_bars(&values, inner_width)
        .into_iter()
        .map(|v| Bar::default().value(v).text_value(String::new()))
        .collect();

    let title = format!(
        "{} | peak {}",
        fig.title,
        format_volume(fig.max_volume() as f64)
    );
    let chart = BarChart::default()
        .block(figure_block(&title))
        .bar_width(1)
        .bar_gap(0)
        .bar_style(Style::default().fg(tui_color(fig.color)))
        .max(fig.max_volume().max(1))
        .data(BarGroup::default().bars(&bars));

    f.render_widget(chart, area);
}

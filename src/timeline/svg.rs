//! Static SVG export of a [`Scene`].

use crate::timeline::render::{Anchor, DrawCommand, Scene};
use std::fmt::Write;

const FONT: &str = "font-family=\"ui-monospace, monospace\" font-size=\"11\"";

/// Serialize `scene` as a standalone SVG document.
///
/// Rows are clipped to the body and shifted by the scene's scroll offset;
/// the grid and header are painted in viewport coordinates so they stay
/// anchored like the interactive view.
pub fn to_svg(scene: &Scene) -> String {
    let width = scene.viewport.width;
    let height = scene.viewport.height;
    let mut svg = String::with_capacity(256 + 96 * (scene.rows.len() + scene.header.len()));

    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">"
    );
    let _ = write!(
        svg,
        "<rect x=\"0\" y=\"0\" width=\"{width}\" height=\"{height}\" fill=\"{}\"/>",
        scene.background
    );

    if let Some(message) = &scene.placeholder {
        let _ = write!(
            svg,
            "<text x=\"{}\" y=\"{}\" {FONT} fill=\"{}\" text-anchor=\"middle\" dominant-baseline=\"middle\">{}</text>",
            width / 2.0,
            height / 2.0,
            scene.foreground,
            xml_escape(message)
        );
        svg.push_str("</svg>");
        return svg;
    }

    let body_height = (height - scene.body_top).max(0.0);
    let _ = write!(
        svg,
        "<defs><clipPath id=\"body\"><rect x=\"0\" y=\"{}\" width=\"{width}\" height=\"{body_height}\"/></clipPath></defs>",
        scene.body_top
    );

    svg.push_str("<g class=\"grid\">");
    for command in &scene.grid {
        push_command(&mut svg, command);
    }
    svg.push_str("</g>");

    let _ = write!(
        svg,
        "<g class=\"rows\" clip-path=\"url(#body)\"><g transform=\"translate(0,{})\">",
        -scene.scroll_top
    );
    for command in &scene.rows {
        push_command(&mut svg, command);
    }
    svg.push_str("</g></g>");

    svg.push_str("<g class=\"header\">");
    for command in &scene.header {
        push_command(&mut svg, command);
    }
    svg.push_str("</g></svg>");
    svg
}

fn push_command(svg: &mut String, command: &DrawCommand) {
    let _ = match command {
        DrawCommand::Rect {
            x,
            y,
            width,
            height,
            fill,
        } => write!(
            svg,
            "<rect x=\"{x}\" y=\"{y}\" width=\"{width}\" height=\"{height}\" rx=\"2\" fill=\"{fill}\"/>"
        ),
        DrawCommand::Line {
            x1,
            y1,
            x2,
            y2,
            color,
        } => write!(
            svg,
            "<line x1=\"{x1}\" y1=\"{y1}\" x2=\"{x2}\" y2=\"{y2}\" stroke=\"{color}\" stroke-width=\"1\"/>"
        ),
        DrawCommand::Text {
            x,
            y,
            text,
            color,
            anchor,
            bold,
        } => {
            let anchor = match anchor {
                Anchor::Start => "start",
                Anchor::Middle => "middle",
                Anchor::End => "end",
            };
            let weight = if *bold { " font-weight=\"bold\"" } else { "" };
            write!(
                svg,
                "<text x=\"{x}\" y=\"{y}\" {FONT}{weight} fill=\"{color}\" text-anchor=\"{anchor}\" dominant-baseline=\"middle\">{}</text>",
                xml_escape(text)
            )
        },
        DrawCommand::Dot { cx, cy, r, color } => write!(
            svg,
            "<circle cx=\"{cx}\" cy=\"{cy}\" r=\"{r}\" fill=\"{color}\"/>"
        ),
    };
}

fn xml_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

use std::fmt::Write;

use super::inr::format_optional_inr;
use super::{headers, report_lines};
use crate::core::Projection;

/// Renders the ledger as a `<table>` fragment. Every cell is a formatted
/// number or the placeholder, so nothing needs escaping beyond the headers.
pub fn render_table(projection: &Projection) -> String {
    let mut html = String::new();
    html.push_str("<table class=\"ledger\">\n<thead>\n<tr>");
    for header in headers(projection) {
        let _ = write!(html, "<th>{}</th>", escape(header));
    }
    html.push_str("</tr>\n</thead>\n<tbody>\n");
    for line in report_lines(projection) {
        let _ = write!(html, "<tr><td>{}</td>", line.year);
        for amount in line.amounts {
            let _ = write!(html, "<td>{}</td>", format_optional_inr(amount));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>\n");
    html
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

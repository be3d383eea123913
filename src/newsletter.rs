// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MonteCrypto

//! Scam Watch email rendering.
//!
//! Every interpolated value comes from model output or an admin form, so all
//! of it goes through [`escape_html`]; link targets use [`escape_attribute`].

use crate::storage::Newsletter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

const FOOTER: &str = "You are receiving Scam Watch as part of your MonteCrypto Scam Likely subscription.";

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Quote-only escape for values placed inside a quoted attribute.
pub fn escape_attribute(input: &str) -> String {
    input.replace('"', "&quot;").replace('\'', "&#39;")
}

pub fn render_email(newsletter: &Newsletter) -> RenderedEmail {
    RenderedEmail {
        subject: format!("Scam Watch: {}", newsletter.headline),
        html: render_html(newsletter),
        text: render_text(newsletter),
    }
}

fn render_html(newsletter: &Newsletter) -> String {
    let mut insights = String::new();
    for insight in &newsletter.insights {
        insights.push_str(&format!(
            r#"
      <li style="margin-bottom:16px;">
        <h3 style="margin:0;color:#0ea5e9;font-size:18px;">{title}</h3>
        <p style="margin:8px 0;color:#1f2937;line-height:1.5;">{summary}</p>
        <p style="margin:8px 0;color:#111827;font-weight:600;">Threat Level: {threat}</p>
        <p style="margin:8px 0;color:#2563eb;">Avoid: {avoid}</p>
      </li>"#,
            title = escape_html(&insight.title),
            summary = escape_html(&insight.summary),
            threat = escape_html(insight.threat_level.as_deref().unwrap_or("Unknown")),
            avoid = escape_html(&insight.how_to_avoid),
        ));
    }

    let mut sources = String::new();
    for source in &newsletter.sources {
        sources.push_str(&format!(
            r#"
      <li style="margin-bottom:8px;">
        <a href="{href}" style="color:#2563eb;text-decoration:none;">{label}</a>
      </li>"#,
            href = escape_attribute(&source.uri),
            label = escape_html(source.title.as_deref().unwrap_or(&source.uri)),
        ));
    }

    format!(
        r#"<div style="font-family:Arial, Helvetica, sans-serif;max-width:640px;margin:0 auto;padding:24px;background:#0f172a;color:#e2e8f0;">
  <p style="color:#94a3b8;font-size:12px;margin:0 0 16px;">{preheader}</p>
  <h1 style="margin:0 0 16px;font-size:28px;line-height:1.3;color:#38bdf8;">{headline}</h1>
  <p style="font-size:16px;line-height:1.6;margin:0 0 24px;">{summary}</p>
  <ul style="list-style:none;margin:0 0 24px;background:#0b1220;border-radius:16px;padding:24px;">{insights}
  </ul>
  <div style="background:#020617;border-radius:16px;padding:20px;">
    <h2 style="margin:0 0 12px;font-size:18px;color:#38bdf8;">Sources</h2>
    <ul style="list-style:none;padding:0;margin:0;">{sources}
    </ul>
  </div>
  <p style="margin-top:32px;font-size:12px;color:#64748b;">{FOOTER}</p>
</div>"#,
        preheader = escape_html(&newsletter.summary),
        headline = escape_html(&newsletter.headline),
        summary = escape_html(&newsletter.summary),
    )
}

fn render_text(newsletter: &Newsletter) -> String {
    let insights = newsletter
        .insights
        .iter()
        .map(|insight| {
            format!(
                "- {}\n  {}\n  Threat Level: {}\n  Avoid: {}",
                insight.title,
                insight.summary,
                insight.threat_level.as_deref().unwrap_or("Unknown"),
                insight.how_to_avoid
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let sources = newsletter
        .sources
        .iter()
        .map(|source| {
            format!(
                "- {}: {}",
                source.title.as_deref().unwrap_or(&source.uri),
                source.uri
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Scam Watch: {}\n\n{}\n\n{insights}\n\nSources\n{sources}\n\n{FOOTER}",
        newsletter.headline, newsletter.summary
    )
}

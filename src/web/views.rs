//! Server-rendered HTML for the four dashboard views

use super::chart::count_chart_svg;
use crate::feedback::{FeedbackLabel, FeedbackRecord, DATE_FORMAT};
use crate::session::SessionState;
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use std::collections::BTreeMap;
use std::fmt::Write;

const TITLE: &str = "Climate Change Research Analyzer";
const IMAGE: &str = "https://miro.medium.com/v2/resize:fit:1400/1*02uoHJoYt3E7rylWEny02w.jpeg";
const IMAGE_CAPTION: &str = "Climate Changes";

const STYLE: &str = "body{font-family:sans-serif;margin:0;display:flex}\
aside{width:280px;background:#f0f2f6;padding:1rem;min-height:100vh;overflow-wrap:anywhere}\
main{flex:1;padding:1rem 2rem;max-width:900px}\
nav a{margin-right:1rem;padding:.4rem .8rem;text-decoration:none;border-bottom:2px solid transparent}\
nav a.active{border-color:#ff4b4b;color:#ff4b4b}\
.error{background:#ffe5e5;color:#7d1a1a;padding:.8rem;border-radius:4px}\
.notice{background:#e8f5e9;padding:.5rem .8rem;border-radius:4px;margin:.3rem 0}\
.buttons{display:flex;gap:1rem}.buttons button{flex:1;padding:.6rem}\
table{border-collapse:collapse;width:100%}td,th{border:1px solid #ddd;padding:.4rem;vertical-align:top}\
figure img{max-width:100%}\
.progress{color:#555;font-style:italic}";

const UPLOAD_PROGRESS: &str = "Extracting Texts and Getting the Summary...";
const ANSWER_PROGRESS: &str = "Getting response......";

/// Reveals the hidden indicator right after the form while the request runs
const SHOW_PROGRESS: &str = "this.nextElementSibling.hidden=false";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Summary,
    QuestionAnswering,
    Feedbacks,
    Dashboard,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Summary, Tab::QuestionAnswering, Tab::Feedbacks, Tab::Dashboard];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Summary => "Summary",
            Tab::QuestionAnswering => "Question Answering",
            Tab::Feedbacks => "Feedbacks",
            Tab::Dashboard => "Dashboard",
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Tab::Summary => "/summary",
            Tab::QuestionAnswering => "/qa",
            Tab::Feedbacks => "/feedback",
            Tab::Dashboard => "/dashboard",
        }
    }
}

/// Busy message shown while a submitted form waits for its response
fn progress_indicator(message: &str) -> String {
    format!(r#"<p class="progress" role="status" hidden>{} ⏳</p>"#, text(message))
}

fn error_box(message: &str) -> String {
    format!(r#"<div class="error">{} 🚨</div>"#, text(message))
}

/// Extracted text and summary, shown in the sidebar of every view
fn sidebar(session: &SessionState) -> String {
    let Some(doc) = session.document() else {
        return String::new();
    };
    format!(
        "<aside><h3>Extracted Texts</h3>\
         <details><summary>View Extracted Text</summary><h4>Extracted Text from the PDF</h4><p>{}</p></details>\
         <h3>Generated Summary</h3><p>{}</p>\
         <form method=\"post\" action=\"/session/end\"><button type=\"submit\">End session</button></form></aside>",
        paragraphs(&doc.extracted_text),
        paragraphs(&doc.summary),
    )
}

/// Escape text and keep its line breaks
fn paragraphs(s: &str) -> String {
    text(s).replace('\n', "<br>")
}

/// Page shell: title, header image, tabs and sidebar around a view body
pub fn layout(active: Tab, session: &SessionState, body: &str) -> String {
    let mut nav = String::new();
    for tab in Tab::ALL {
        let class = if tab == active { " class=\"active\"" } else { "" };
        let _ = write!(nav, r#"<a href="{}"{}>{}</a>"#, tab.path(), class, text(tab.title()));
    }

    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\"><title>{title} · {tab}</title>\
         <style>{style}</style></head><body>{sidebar}<main><h1>{title}</h1>\
         <figure><img src=\"{image}\" alt=\"{caption}\"><figcaption>{caption}</figcaption></figure>\
         <nav>{nav}</nav><section>{body}</section></main></body></html>",
        title = TITLE,
        tab = text(active.title()),
        style = STYLE,
        sidebar = sidebar(session),
        image = attr(IMAGE),
        caption = IMAGE_CAPTION,
        nav = nav,
        body = body,
    )
}

/// Upload form, plus the processed document when there is one
pub fn summary_page(session: &SessionState, notices: &[&str], error: Option<&str>) -> String {
    let mut body = format!(
        "<h2>Please Upload a Research Article in PDF Format</h2>\
         <form method=\"post\" action=\"/summary\" enctype=\"multipart/form-data\" onsubmit=\"{}\">\
         <label>Upload PDF file <input type=\"file\" name=\"pdf\" accept=\".pdf,application/pdf\" required></label>\
         <button type=\"submit\">Upload</button></form>{}",
        SHOW_PROGRESS,
        progress_indicator(UPLOAD_PROGRESS),
    );

    if let Some(message) = error {
        body.push_str(&error_box(message));
    }
    for notice in notices {
        let _ = write!(body, r#"<div class="notice">{} 👍</div>"#, text(notice));
    }

    if let Some(doc) = session.document() {
        let _ = write!(
            body,
            "<p>Document: <strong>{}</strong></p>\
             <details><summary>View Extracted Text</summary><h3>Extracted Text from the PDF</h3><p>{}</p></details>\
             <h3>Generated Summary</h3><p>{}</p>",
            text(&doc.file_name),
            paragraphs(&doc.extracted_text),
            paragraphs(&doc.summary),
        );
    }

    layout(Tab::Summary, session, &body)
}

/// Question form and the latest answer
pub fn qa_page(session: &SessionState, question: Option<&str>, answer: Option<&str>, error: Option<&str>) -> String {
    let mut body = String::new();

    if session.current_store_handle().is_none() {
        body.push_str(&error_box(error.unwrap_or("Please upload a PDF before this method")));
        return layout(Tab::QuestionAnswering, session, &body);
    }

    let _ = write!(
        body,
        "<form method=\"post\" action=\"/qa\" onsubmit=\"{}\"><label>Please Enter Your Question \
         <input type=\"text\" name=\"query\" value=\"{}\" size=\"60\"></label>\
         <button type=\"submit\">Ask</button></form>{}",
        SHOW_PROGRESS,
        attr(question.unwrap_or("")),
        progress_indicator(ANSWER_PROGRESS),
    );
    if let Some(message) = error {
        body.push_str(&error_box(message));
    }
    if let Some(answer) = answer {
        let _ = write!(body, "<h3>Response</h3><p>{}</p>", paragraphs(answer));
    }

    layout(Tab::QuestionAnswering, session, &body)
}

/// Yes/No buttons, disabled once this session has given feedback
pub fn feedback_page(session: &SessionState, thanks: bool, error: Option<&str>) -> String {
    let mut body = String::from(
        "<h2>Feedback Page</h2><h3>Please provide your feedback with web interaction</h3>\
         <p><strong>Are you satisfied with the service?</strong></p>",
    );

    if session.current_summary().is_none() {
        body.push_str(&error_box(error.unwrap_or("Please generate a summary before giving a feedback")));
        return layout(Tab::Feedbacks, session, &body);
    }

    let disabled = if session.feedback_disabled() { " disabled" } else { "" };
    body.push_str("<form method=\"post\" action=\"/feedback\" class=\"buttons\">");
    for label in FeedbackLabel::ALL {
        let _ = write!(
            body,
            r#"<button type="submit" name="label" value="{l}"{d}>{l}</button>"#,
            l = label,
            d = disabled,
        );
    }
    body.push_str("</form>");

    if let Some(message) = error {
        body.push_str(&error_box(message));
    }
    if thanks {
        body.push_str("<h2>Thank You For Your Feedback!</h2>");
    }

    layout(Tab::Feedbacks, session, &body)
}

pub enum DashboardView<'a> {
    /// The feedback log has never been written
    NoFeedback,
    Records(&'a [FeedbackRecord], &'a BTreeMap<FeedbackLabel, usize>),
    Unreadable(&'a str),
}

/// Table of every feedback row and the count chart
pub fn dashboard_page(session: &SessionState, view: DashboardView<'_>) -> String {
    let mut body = String::from("<h2>Feedback Analysis</h2><h3>Feedback Data</h3>");

    match view {
        DashboardView::NoFeedback => {
            body.push_str(&error_box("Take Some Feedbacks from Users to view the Analytics"));
        }
        DashboardView::Unreadable(message) => {
            body.push_str(&error_box(message));
        }
        DashboardView::Records(records, counts) => {
            body.push_str("<table><thead><tr><th></th><th>Date</th><th>Summary</th><th>Feedback</th></tr></thead><tbody>");
            for (i, record) in records.iter().enumerate() {
                let _ = write!(
                    body,
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                    i,
                    record.timestamp.format(DATE_FORMAT),
                    paragraphs(&record.summary),
                    record.label,
                );
            }
            body.push_str("</tbody></table>");
            let _ = write!(body, "<figure>{}</figure>", count_chart_svg(counts));
        }
    }

    layout(Tab::Dashboard, session, &body)
}

/// Minimal page for request-level errors
pub fn error_page(message: &str) -> String {
    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\"><title>{}</title></head>\
         <body><main>{}<p><a href=\"/summary\">Back</a></p></main></body></html>",
        TITLE,
        error_box(message),
    )
}

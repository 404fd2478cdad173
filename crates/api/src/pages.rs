//! Server-rendered HTML pages.

use intake_core::upload::fields;

use crate::pipeline::IntakeOutcome;

/// Shown under a document whose text could not be read.
pub const READ_FAILED_NOTICE: &str =
    "This document was read improperly. Please upload a clearer image and try again.";

/// Escape text for interpolation into HTML element content or attributes.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n</head>\n<body>\n{body}</body>\n</html>\n",
        title = escape_html(title),
    )
}

/// `GET /`: the upload form.
pub fn upload_form() -> String {
    let body = format!(
        "<h1>Upload your documents</h1>\n\
         <form action=\"/upload\" method=\"post\" enctype=\"multipart/form-data\">\n\
         <p><label>Pay stub <input type=\"file\" name=\"{paystub}\" accept=\".txt,.pdf,.png,.jpg,.jpeg,.gif\"></label></p>\n\
         <p><label>Identification <input type=\"file\" name=\"{id}\" accept=\".txt,.pdf,.png,.jpg,.jpeg,.gif\"></label></p>\n\
         <p><label>Email <input type=\"email\" name=\"{email}\"></label></p>\n\
         <p><label>Signature <input type=\"text\" name=\"{signature}\"></label></p>\n\
         <p><label>Date <input type=\"date\" name=\"{sign_date}\"></label></p>\n\
         <p><button type=\"submit\">Submit</button></p>\n\
         </form>\n",
        paystub = fields::PAYSTUB,
        id = fields::ID,
        email = fields::EMAIL,
        signature = fields::SIGNATURE,
        sign_date = fields::SIGN_DATE,
    );
    page("Document upload", &body)
}

/// The error page: the message and a link back to the form.
pub fn error_page(message: &str) -> String {
    let body = format!(
        "<h1>Upload failed</h1>\n<p class=\"error\">{}</p>\n<p><a href=\"/\">Back to upload</a></p>\n",
        escape_html(message)
    );
    page("Upload failed", &body)
}

/// `POST /upload`: per-document records and the delivery status.
pub fn results_page(outcome: &IntakeOutcome) -> String {
    let mut body = String::from("<h1>Application Results</h1>\n");

    for document in &outcome.documents {
        body.push_str(&format!(
            "<section>\n<h2>{}</h2>\n<ul>\n",
            escape_html(document.role.label())
        ));
        for record in &document.records {
            body.push_str(&format!("<li>{}</li>\n", escape_html(&record.summary())));
        }
        body.push_str("</ul>\n");
        if document.read_failed {
            body.push_str(&format!(
                "<p class=\"notice\">{}</p>\n",
                escape_html(READ_FAILED_NOTICE)
            ));
        }
        body.push_str("</section>\n");
    }

    body.push_str(&format!(
        "<p class=\"delivery\">{}</p>\n",
        escape_html(&outcome.delivery.to_string())
    ));
    body.push_str(&format!(
        "<p class=\"reference\">Reference: {}</p>\n",
        outcome.request_id
    ));
    body.push_str("<p><a href=\"/\">Submit another application</a></p>\n");

    page("Application Results", &body)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use intake_core::extraction::{Decision, ExtractionRecord};
    use intake_core::upload::DocumentRole;
    use intake_notify::DeliveryStatus;
    use uuid::Uuid;

    use super::*;
    use crate::pipeline::DocumentResult;

    fn outcome(read_failed: bool) -> IntakeOutcome {
        let records = if read_failed {
            ExtractionRecord::processing_failed()
        } else {
            vec![
                ExtractionRecord::Income {
                    income: 3999.99,
                    decision: Decision::Denied,
                },
                ExtractionRecord::Dln {
                    dln: "AB12345".into(),
                    decision: Decision::Processed,
                },
            ]
        };
        IntakeOutcome {
            request_id: Uuid::nil(),
            documents: vec![DocumentResult {
                role: DocumentRole::Paystub,
                stored_path: PathBuf::from("uploads/stub.png"),
                records,
                read_failed,
            }],
            pdf_path: PathBuf::from("output/results.pdf"),
            qr_path: None,
            delivery: DeliveryStatus::Skipped {
                reason: "no email address was provided".into(),
            },
        }
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<script>alert("x") & 'y'</script>"#),
            "&lt;script&gt;alert(&quot;x&quot;) &amp; &#39;y&#39;&lt;/script&gt;"
        );
    }

    #[test]
    fn form_posts_multipart_to_upload() {
        let html = upload_form();
        assert!(html.contains(r#"action="/upload""#));
        assert!(html.contains(r#"enctype="multipart/form-data""#));
        for name in ["paystub", "id", "email", "signature", "sign_date"] {
            assert!(html.contains(&format!(r#"name="{name}""#)), "missing {name}");
        }
    }

    #[test]
    fn error_page_escapes_message_and_links_home() {
        let html = error_page("<b>bad</b>");
        assert!(html.contains("&lt;b&gt;bad&lt;/b&gt;"));
        assert!(html.contains(r#"<a href="/">"#));
    }

    #[test]
    fn results_list_records_and_delivery() {
        let html = results_page(&outcome(false));
        assert!(html.contains("Pay stub"));
        assert!(html.contains("Income: $3999.99 - Denied"));
        assert!(html.contains("DLN: AB12345 - Processed"));
        assert!(html.contains("Email not sent: no email address was provided"));
        assert!(!html.contains(READ_FAILED_NOTICE));
    }

    #[test]
    fn failed_read_shows_notice() {
        let html = results_page(&outcome(true));
        assert!(html.contains("Error: Error processing image"));
        assert!(html.contains(READ_FAILED_NOTICE));
    }
}

use chrono::{DateTime, Utc};

const APP_NAME: &str = "Famiglia Recipes";

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{title}</title></head>
<body style="font-family: Arial, sans-serif; background: #f6f6f6; padding: 24px;">
<div style="max-width: 560px; margin: 0 auto; background: #ffffff; padding: 32px; border-radius: 8px;">
<h1 style="font-size: 20px; color: #333333;">{app}</h1>
{body}
</div>
</body>
</html>"#,
        title = escape(title),
        app = APP_NAME,
        body = body,
    )
}

fn button(link: &str, label: &str) -> String {
    format!(
        r#"<p style="text-align: center; margin: 32px 0;"><a href="{link}" style="background: #e07a5f; color: #ffffff; padding: 12px 24px; border-radius: 4px; text-decoration: none;">{label}</a></p>
<p style="font-size: 12px; color: #888888;">If the button does not work, copy this link into your browser:<br>{link}</p>"#,
        link = escape(link),
        label = label,
    )
}

/// Subject and body of the email sent after registration.
pub fn verification_email(username: &str, link: &str) -> (String, String) {
    let subject = format!("{} - Verify your email", APP_NAME);
    let body = format!(
        "<p>Hello {},</p><p>Welcome to {}! Please confirm your email address to activate your account.</p>{}",
        escape(username),
        APP_NAME,
        button(link, "Verify my email"),
    );
    let html = layout(&subject, &body);
    (subject, html)
}

pub fn password_reset_email(username: &str, link: &str) -> (String, String) {
    let subject = format!("{} - Reset your password", APP_NAME);
    let body = format!(
        "<p>Hello {},</p><p>Someone asked to reset the password of your account. If it was not you, ignore this email.</p>{}",
        escape(username),
        button(link, "Reset my password"),
    );
    let html = layout(&subject, &body);
    (subject, html)
}

pub fn admin_error_report(
    error_name: &str,
    error_message: &str,
    method: &str,
    path: &str,
    timestamp: DateTime<Utc>,
) -> (String, String) {
    let subject = format!("{} - An Error Occurred", APP_NAME);
    let body = format!(
        r#"<p>An unexpected error was returned to a user.</p>
<table style="border-collapse: collapse; font-size: 14px;">
<tr><td style="padding: 4px 12px 4px 0;"><b>Error</b></td><td>{}</td></tr>
<tr><td style="padding: 4px 12px 4px 0;"><b>Message</b></td><td><pre style="white-space: pre-wrap;">{}</pre></td></tr>
<tr><td style="padding: 4px 12px 4px 0;"><b>Request</b></td><td>{} {}</td></tr>
<tr><td style="padding: 4px 12px 4px 0;"><b>Time</b></td><td>{}</td></tr>
</table>"#,
        escape(error_name),
        escape(error_message),
        escape(method),
        escape(path),
        timestamp.to_rfc3339(),
    );
    let html = layout(&subject, &body);
    (subject, html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_email_contains_link() {
        let (subject, html) =
            verification_email("Nonna", "http://localhost:3000/verify-email?token=abc");
        assert!(subject.contains("Verify"));
        assert!(html.contains("Hello Nonna"));
        assert!(html.contains("verify-email?token=abc"));
    }

    #[test]
    fn test_user_content_is_escaped() {
        let (_, html) = password_reset_email("<script>", "http://x/reset?token=1&a=2");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("token=1&amp;a=2"));
    }
}

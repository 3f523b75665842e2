//! Message templates.
//!
//! Every interpolated value is HTML-escaped, including links.

use pulse_core::EmailAddress;

use crate::MailMessage;

pub const GUEST_INVITE_SUBJECT: &str = "You have been invited to take a survey";

/// Escape text for inclusion in HTML element content or a quoted attribute.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
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

/// "7 days", "1 day", or "36 hours" for lifetimes not a whole number of days.
pub fn lifetime_phrase(ttl_hours: i64) -> String {
    let plural = |n: i64, unit: &str| {
        if n == 1 {
            format!("1 {unit}")
        } else {
            format!("{n} {unit}s")
        }
    };
    if ttl_hours > 0 && ttl_hours % 24 == 0 {
        plural(ttl_hours / 24, "day")
    } else {
        plural(ttl_hours, "hour")
    }
}

/// The magic-link email sent to a guest.
pub fn guest_invite(to: &EmailAddress, link: &str, ttl_hours: i64) -> MailMessage {
    let link = escape_html(link);
    MailMessage {
        to: to.clone(),
        subject: GUEST_INVITE_SUBJECT.to_string(),
        html: format!(
            "<p>Hello,</p>\
             <p>You've been invited to complete a survey. Please click the link below to begin:</p>\
             <p><a href=\"{link}\">Start Survey</a></p>\
             <p>This link is unique to you and will expire in {}.</p>",
            lifetime_phrase(ttl_hours)
        ),
    }
}

/// Invitation for a newly added employee.
pub fn employee_invite(
    to: &EmailAddress,
    first_name: &str,
    company: &str,
    sign_in_url: &str,
) -> MailMessage {
    MailMessage {
        to: to.clone(),
        subject: format!("You have been added to {company} on Pulse"),
        html: format!(
            "<p>Hi {},</p>\
             <p>{} has invited you to take part in team surveys.</p>\
             <p><a href=\"{}\">Sign in</a> with this email address to get started.</p>",
            escape_html(first_name),
            escape_html(company),
            escape_html(sign_in_url)
        ),
    }
}

/// Notification that a survey is waiting on the employee's dashboard.
pub fn survey_assigned(
    to: &EmailAddress,
    first_name: &str,
    survey_title: &str,
    dashboard_url: &str,
) -> MailMessage {
    let title = escape_html(survey_title);
    MailMessage {
        to: to.clone(),
        subject: format!("New survey: {survey_title}"),
        html: format!(
            "<p>Hi {},</p>\
             <p>A new survey, <strong>{title}</strong>, is waiting for you.</p>\
             <p><a href=\"{}\">Open your dashboard</a> to respond.</p>",
            escape_html(first_name),
            escape_html(dashboard_url)
        ),
    }
}

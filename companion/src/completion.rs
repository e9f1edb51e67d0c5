const STYLE: &str = "body{font-family:Arial,sans-serif;text-align:center;padding:40px 20px;background:#f0f0f0}\
.success{background:#4CAF50;color:white;padding:20px;border-radius:10px;margin:20px 0;font-size:18px}\
.instructions{margin:20px 0;color:#666;line-height:1.5}\
.version{margin-top:30px;color:#999;font-size:14px}\
.btn{background:#2196F3;color:white;border:none;padding:15px 30px;font-size:16px;border-radius:5px;cursor:pointer;margin-top:20px}";

/// Page shown by the configurator once settings are submitted.
pub fn render_completion_page(app_version: &str) -> String {
    let version = escape_html(app_version);
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\">\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
<title>Settings Saved</title><style>{STYLE}</style></head><body>\
<div class=\"success\">&#10003; Configuration Saved</div>\
<div class=\"instructions\">Your timezone settings have been updated!<br><br>\
<strong>Button Controls v{version}:</strong><br>\
&bull; UP button: Previous timezone<br>\
&bull; DOWN button: Next timezone<br>\
&bull; SELECT button: Toggle backlight<br>\
&bull; BACK button: Single press ignored<br>\
&bull; BACK button: Hold to exit app</div>\
<div class=\"version\">Timezone Traveler App v{version}</div>\
<button class=\"btn\" onclick=\"document.location='pebblejs://close'\">Close</button>\
</body></html>"
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

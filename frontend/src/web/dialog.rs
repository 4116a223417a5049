//! 浏览器对话框与页面操作

/// `window.alert`
pub fn alert(message: &str) {
    if let Some(window) = web_sys::window() {
        let _ = window.alert_with_message(message);
    }
}

/// `window.confirm`，无法弹出时视为取消
pub fn confirm(message: &str) -> bool {
    web_sys::window()
        .and_then(|w| w.confirm_with_message(message).ok())
        .unwrap_or(false)
}

/// 拨打电话（`tel:` 链接）
pub fn dial(number: &str) {
    if let Some(window) = web_sys::window() {
        let _ = window.location().set_href(&format!("tel:{}", number));
    }
}

pub fn reload() {
    if let Some(window) = web_sys::window() {
        let _ = window.location().reload();
    }
}

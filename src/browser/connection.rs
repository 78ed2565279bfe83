//! 浏览器连接
//!
//! 连接到已运行的 Chrome 调试端口，并在已打开的标签页中定位表单页面。
//! 不主动导航：答题依赖用户已经打开并登录的表单页。

use anyhow::{bail, Result};
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// 连接到浏览器并查找目标表单页面
///
/// # 参数
/// - `port`: 浏览器调试端口
/// - `url_pattern`: 页面 URL 需要包含的特征串（如 "docs.google.com/forms"）
///
/// # 返回
/// 返回 (浏览器句柄, 表单页面)
pub async fn connect_to_form_page(port: u16, url_pattern: &str) -> Result<(Browser, Page)> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        e
    })?;
    debug!("浏览器连接成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 短暂延迟等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    let pages = browser.pages().await?;
    debug!("获取到 {} 个页面", pages.len());

    // 在已打开的标签页中查找 URL 匹配的表单页
    for p in pages.iter() {
        if let Ok(Some(url)) = p.url().await {
            debug!("检查页面 URL: {}", url);
            if url.contains(url_pattern) {
                info!("✓ 找到目标表单页面: {}", url);
                return Ok((browser, p.clone()));
            }
        }
    }

    bail!(
        "未找到 URL 包含 \"{}\" 的标签页，请先在浏览器中打开目标表单",
        url_pattern
    );
}

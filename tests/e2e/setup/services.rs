//! 进程内服务管理
//!
//! 服务绑定到 127.0.0.1 的临时端口，测试结束时随运行时一起退出。

use std::time::Duration;

use anyhow::{Result, bail};
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// 已启动的服务
pub struct ServiceHandle {
    pub name: &'static str,
    pub base_url: String,
    task: JoinHandle<()>,
}

impl Drop for ServiceHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// 在临时端口启动路由
pub async fn spawn_service(name: &'static str, app: Router) -> Result<ServiceHandle> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(service = name, error = %e, "测试服务异常退出");
        }
    });

    Ok(ServiceHandle {
        name,
        base_url: format!("http://{}", addr),
        task,
    })
}

/// 轮询 /health 直到服务就绪
pub async fn wait_until_healthy(service: &ServiceHandle, timeout: Duration) -> Result<()> {
    let client = reqwest::Client::new();
    let url = format!("{}/health", service.base_url);
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        if let Ok(resp) = client.get(&url).send().await
            && resp.status().is_success()
        {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            bail!("服务 {} 未在 {:?} 内就绪", service.name, timeout);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

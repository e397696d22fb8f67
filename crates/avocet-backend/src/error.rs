//! 后端层错误类型定义

use thiserror::Error;

/// 后端适配器错误类型
///
/// 对核心层不透明：核心只区分成功/失败，具体原因原样上抛给
/// 传输层做外部信号映射。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    /// 设备级错误（通信中断、固件报错等）
    #[error("Device error: {0}")]
    Device(String),

    /// 后端尚未完成初始化
    #[error("Backend not set up")]
    NotReady,

    /// 后端拒绝执行批次
    #[error("Batch rejected by backend: {reason}")]
    Rejected { reason: String },
}

#[cfg(test)]
mod tests {
    use super::BackendError;

    /// 测试 BackendError 的 Display 实现
    #[test]
    fn test_backend_error_display() {
        let err = BackendError::Device("CAN bus timeout".to_string());
        let msg = format!("{}", err);
        assert!(msg.contains("Device error") && msg.contains("CAN bus timeout"));

        let err = BackendError::NotReady;
        assert_eq!(format!("{}", err), "Backend not set up");

        let err = BackendError::Rejected {
            reason: "tip type unsupported".to_string(),
        };
        assert!(format!("{}", err).contains("tip type unsupported"));
    }
}

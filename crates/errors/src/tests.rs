#[cfg(test)]
mod error_tests {
    use crate::*;

    #[test]
    fn test_tasking_error_display() {
        let err = TaskingError::unknown_extension("pncode");
        assert_eq!(err.to_string(), "未知的扩展: pncode");

        let err = TaskingError::FieldCollision {
            field: "x".to_string(),
            first_owner: "alpha".to_string(),
            second_owner: "beta".to_string(),
        };
        assert_eq!(err.to_string(), "字段冲突: x 同时由 alpha 和 beta 提供");

        let err = TaskingError::unknown_task_type("foo");
        assert_eq!(err.to_string(), "未知的任务类型: foo");

        let err = TaskingError::field_violation("key", "长度必须为12");
        assert_eq!(err.to_string(), "字段 key 校验失败: 长度必须为12");

        let err = TaskingError::corrupt_document("bad", "不是JSON对象");
        assert_eq!(err.to_string(), "文档 bad 已损坏: 不是JSON对象");
    }

    #[test]
    fn test_decode_error_wraps_into_tasking_error() {
        let decode = DecodeError::UnresolvedTaskType {
            task_type: "gone".to_string(),
        };
        let err: TaskingError = decode.clone().into();

        assert_eq!(err, TaskingError::Decode(decode));
        assert_eq!(err.to_string(), "文档解码失败: 任务类型 gone 未注册");
    }

    #[test]
    fn test_error_classification() {
        assert!(TaskingError::InvalidTaskTypeName {
            name: "A1".to_string()
        }
        .is_registration_error());
        assert!(TaskingError::invalid_extension_args("keynonce", "bad").is_registration_error());
        assert!(!TaskingError::unknown_task_type("foo").is_registration_error());
        assert!(!TaskingError::field_violation("nonce", "bad").is_registration_error());
        assert!(!TaskingError::database_error("down").is_registration_error());
    }

    #[test]
    fn test_user_message() {
        assert_eq!(
            TaskingError::unknown_task_type("foo").user_message(),
            "请求的任务类型不存在"
        );
        assert_eq!(
            TaskingError::TaskTypeAlreadyExists {
                name: "foo".to_string()
            }
            .user_message(),
            "同名任务类型已存在"
        );
        assert_eq!(
            TaskingError::database_error("down").user_message(),
            "系统繁忙，请稍后重试"
        );
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: TaskingError = json_err.into();
        assert!(matches!(err, TaskingError::Serialization(_)));
    }

    #[test]
    fn test_from_anyhow_error() {
        let err: TaskingError = anyhow::anyhow!("unexpected").into();
        assert_eq!(err, TaskingError::Internal("unexpected".to_string()));
    }
}

//! 输出文件名生成

use regex::Regex;
use std::sync::OnceLock;

use crate::error::RowError;
use crate::models::{DataRow, FilenameFields};

/// 文件名分隔符
pub const FILENAME_SEPARATOR: &str = "_";

fn illegal_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[\\/:*?"<>|\x00-\x1f]"#).expect("filename pattern is valid"))
}

/// 按字段顺序取值并用 `_` 连接
///
/// 任一字段缺失或为空时返回错误；值中不能出现在文件名里的字符替换为 `_`
///
/// # 参数
/// - `row`: 当前数据行
/// - `fields`: 参与命名的列，按顺序拼接
///
/// # 返回
/// 不含扩展名的文件名
pub fn derive_filename(row: &DataRow, fields: &FilenameFields) -> Result<String, RowError> {
    let parts = fields
        .iter()
        .map(|field| {
            row.text(field)
                .map(|value| illegal_chars().replace_all(&value, "_").into_owned())
                .ok_or_else(|| RowError::FilenameFieldMissing {
                    field: field.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(parts.join(FILENAME_SEPARATOR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_order_decides_token_order() {
        let row = DataRow::from_pairs([("a", "X"), ("b", "Y")]);
        let ab = FilenameFields::new(["a", "b"]).unwrap();
        let ba = FilenameFields::new(["b", "a"]).unwrap();
        assert_eq!(derive_filename(&row, &ab).unwrap(), "X_Y");
        assert_eq!(derive_filename(&row, &ba).unwrap(), "Y_X");
    }

    #[test]
    fn missing_or_empty_field_is_an_error() {
        let row = DataRow::from_pairs([("a", "X"), ("b", "")]);
        let err = derive_filename(&row, &FilenameFields::new(["a", "b"]).unwrap()).unwrap_err();
        assert!(matches!(err, RowError::FilenameFieldMissing { ref field } if field == "b"));
        assert!(derive_filename(&row, &FilenameFields::new(["c"]).unwrap()).is_err());
    }

    #[test]
    fn path_separators_are_replaced() {
        let row = DataRow::from_pairs([("client", "A/B: \"C\""), ("id", "7")]);
        let fields = FilenameFields::new(["client", "id"]).unwrap();
        assert_eq!(derive_filename(&row, &fields).unwrap(), "A_B_ _C__7");
    }
}

use crate::bridge::script::MAX_FILE_NAME_LEN;

/// 文件名中保留的标识前缀长度
pub const ID_PREFIX_LEN: usize = 8;

/// 调用方指定扩展名的最大长度
const MAX_EXTENSION_LEN: usize = 16;

/// 显示名称过滤后为空时使用的名字
const FALLBACK_STEM: &str = "emote";

pub fn extension_for(animated: bool) -> &'static str {
    if animated {
        "gif"
    } else {
        "png"
    }
}

/// 只保留 `[A-Za-z0-9_-]`
fn keep_safe(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// 生成宿主端文件名：`<名称>_<标识前8位>.<扩展名>`
///
/// 结果是确定的，同一条目重复导入会覆盖同一个临时文件。
/// 名称部分会被截短，保证整个文件名不超过宿主接受的长度。
pub fn sanitize_file_name(display_name: &str, item_id: &str, animated: bool) -> String {
    let extension = extension_for(animated);
    let id_prefix: String = keep_safe(item_id).chars().take(ID_PREFIX_LEN).collect();

    // "_" + 标识前缀 + "." + 扩展名
    let id_part = if id_prefix.is_empty() {
        0
    } else {
        id_prefix.len() + 1
    };
    let suffix_len = id_part + 1 + extension.len();

    // 过滤后只剩 ASCII，按字节截断不会切开字符
    let mut stem = keep_safe(display_name);
    stem.truncate(MAX_FILE_NAME_LEN - suffix_len);
    if stem.is_empty() {
        stem.push_str(FALLBACK_STEM);
    }

    if !id_prefix.is_empty() {
        stem.push('_');
        stem.push_str(&id_prefix);
    }

    format!("{}.{}", stem, extension)
}

/// 清理调用方指定的文件名，保留其扩展名
pub fn sanitize_explicit_name(name: &str, animated: bool) -> String {
    let (stem, extension) = match name.rsplit_once('.') {
        Some((stem, ext)) => (stem, keep_safe(ext).to_ascii_lowercase()),
        None => (name, String::new()),
    };

    let mut extension = if extension.is_empty() {
        extension_for(animated).to_string()
    } else {
        extension
    };
    extension.truncate(MAX_EXTENSION_LEN);

    let mut stem = keep_safe(stem);
    stem.truncate(MAX_FILE_NAME_LEN - 1 - extension.len());
    if stem.is_empty() {
        stem.push_str(FALLBACK_STEM);
    }

    format!("{}.{}", stem, extension)
}

//! 链标识符标准化模块
//!
//! Cosmos 链 ID 形如 `{identifier}-{revision}`（cosmoshub-4、osmosis-1）。
//! 硬分叉升级只改 revision，领取状态需要跨升级保持，因此以去掉 revision 的标识符作为键。

/// 解析后的链 ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedChainId {
    /// 规范标识符（小写，不含 revision）
    pub identifier: String,
    /// revision 号；链 ID 不带版本后缀时为 0
    pub revision: u64,
}

/// 解析链 ID
///
/// 只有 `-` 后紧跟不以 0 开头的十进制数字且前一个字符不是 `-` 时才视为 revision。
pub fn parse_chain_id(chain_id: &str) -> ParsedChainId {
    let trimmed = chain_id.trim();

    if let Some((head, tail)) = trimmed.rsplit_once('-') {
        let is_revision = !head.is_empty()
            && !head.ends_with('-')
            && !tail.is_empty()
            && !tail.starts_with('0')
            && tail.chars().all(|c| c.is_ascii_digit());

        if is_revision {
            if let Ok(revision) = tail.parse::<u64>() {
                return ParsedChainId {
                    identifier: head.to_lowercase(),
                    revision,
                };
            }
        }
    }

    ParsedChainId {
        identifier: trimmed.to_lowercase(),
        revision: 0,
    }
}

/// 标准化链标识符（状态表的键）
pub fn normalize_chain_identifier(chain_id: &str) -> String {
    parse_chain_id(chain_id).identifier
}

/// 两个链 ID 是否指向同一条链（忽略 revision）
pub fn is_same_chain(a: &str, b: &str) -> bool {
    normalize_chain_identifier(a) == normalize_chain_identifier(b)
}

//! 地址匹配判定

use crate::config::SearchSpec;

/// 前缀/后缀匹配器
///
/// 对派生出的地址 (40个小写十六进制字符，不含 0x) 做纯函数判定，
/// 每个候选地址调用一次，与密钥派生一起构成单次迭代的主要开销。
#[derive(Debug, Clone)]
pub struct Matcher {
    prefix: String,
    suffix: String,
}

impl Matcher {
    pub fn new(spec: &SearchSpec) -> Self {
        Self {
            prefix: spec.prefix.clone(),
            suffix: spec.suffix.clone(),
        }
    }

    /// 前缀与后缀同时满足才算命中；空后缀视为通配，无部分匹配计分
    pub fn matches(&self, address_hex: &str) -> bool {
        if !address_hex.starts_with(&self.prefix) {
            return false;
        }
        self.suffix.is_empty() || address_hex.ends_with(&self.suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(prefix: &str, suffix: &str) -> Matcher {
        Matcher::new(&SearchSpec::new(prefix, suffix).unwrap())
    }

    #[test]
    fn test_prefix_and_suffix_both_required() {
        let m = matcher("dead", "beef");
        assert!(m.matches("dead00000000000000000000000000000000beef"));
        assert!(!m.matches("dead000000000000000000000000000000000000"));
        assert!(!m.matches("0000000000000000000000000000000000000000"));
    }

    #[test]
    fn test_empty_suffix_is_wildcard() {
        let m = matcher("88", "");
        assert!(m.matches("8800000000000000000000000000000000000000"));
        assert!(m.matches("88ffffffffffffffffffffffffffffffffffffff"));
        assert!(!m.matches("9800000000000000000000000000000000000000"));
    }

    #[test]
    fn test_empty_prefix_with_suffix() {
        let m = matcher("", "dead");
        assert!(m.matches("000000000000000000000000000000000000dead"));
        assert!(!m.matches("dead000000000000000000000000000000000000"));
    }

    #[test]
    fn test_uppercase_spec_matches_lowercase_address() {
        // 条件在校验时统一转为小写，地址本身就是小写十六进制
        let m = matcher("DEAD", "BEEF");
        assert!(m.matches("dead00000000000000000000000000000000beef"));
    }
}

//! 基于公钥的 Kademlia XOR 距离

use crate::crypto::{PublicKey, PUBLIC_KEY_SIZE};
use std::cmp::Ordering;

/// 计算两个公钥之间的 XOR 距离
///
/// 结果按大端序数字比较，越小越近。
pub fn distance(a: &PublicKey, b: &PublicKey) -> [u8; PUBLIC_KEY_SIZE] {
    let mut result = [0u8; PUBLIC_KEY_SIZE];

    for (i, byte) in result.iter_mut().enumerate() {
        *byte = a.0[i] ^ b.0[i];
    }

    result
}

/// 返回 `a` 和 `b` 中离 `target` 更近的一个
///
/// 距离相等时返回 `a`，因此平局的结果取决于参数顺序。
pub fn closest<'a>(target: &PublicKey, a: &'a PublicKey, b: &'a PublicKey) -> &'a PublicKey {
    let dist_a = distance(target, a);
    let dist_b = distance(target, b);

    for i in 0..PUBLIC_KEY_SIZE {
        match dist_a[i].cmp(&dist_b[i]) {
            Ordering::Less => return a,
            Ordering::Greater => return b,
            Ordering::Equal => {}
        }
    }

    a
}

impl PublicKey {
    /// 计算到另一个公钥的 XOR 距离
    pub fn distance_to(&self, other: &PublicKey) -> [u8; PUBLIC_KEY_SIZE] {
        distance(self, other)
    }

    /// 返回两个公钥中离自身更近的一个
    pub fn closest<'a>(&self, a: &'a PublicKey, b: &'a PublicKey) -> &'a PublicKey {
        closest(self, a, b)
    }
}

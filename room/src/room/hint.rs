use rand::seq::SliceRandom;
use rand::Rng;

const HEADS: [&str; 14] = [
    "眠れる", "空飛ぶ", "伝説の", "宇宙の", "大盛りの", "怒った", "古代の",
    "真っ赤な", "踊る", "巨大な", "透明な", "王様の", "泣いている", "秘密の",
];

const TAILS: [&str; 14] = [
    "ペンギン", "カレー", "ロボット", "おばけ", "すいか", "忍者", "たこ焼き",
    "消しゴム", "ドラゴン", "自転車", "パンダ", "雪だるま", "電子レンジ", "恐竜",
];

/// A throwaway odai to nudge players or to fill in for a silent one.
pub fn odai_example<R: Rng + ?Sized>(rng: &mut R) -> String {
    let head = HEADS.choose(rng).copied().unwrap_or_default();
    let tail = TAILS.choose(rng).copied().unwrap_or_default();
    format!("{}{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn example_is_head_plus_tail() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..32 {
            let odai = odai_example(&mut rng);
            assert!(HEADS.iter().any(|h| odai.starts_with(h)));
            assert!(TAILS.iter().any(|t| odai.ends_with(t)));
        }
    }
}

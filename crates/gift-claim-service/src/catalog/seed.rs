//! 内置礼品列表

/// (名称, 渠道礼品 ID, 星星数)
pub const DEFAULT_GIFTS: &[(&str, &str, u32)] = &[
    ("Heart", "d01a849b9ef17642d8f4", 15),
    ("Bear", "d01a849bfc7f7938aa86", 75),
    ("Rose", "d01a849b9e2c54fb0cf1", 100),
    ("Gift", "d01a849ba490ee9e6308", 125),
    ("Cake", "d01a849bb0e2c9f42a0a", 150),
    ("Rose Bouquet", "d01a849b8c2f0cd6de99", 200),
    ("Ring", "d01a849b9c4de7d48c4e", 300),
    ("Trophy", "d01a849b8de88d0e703d", 500),
    ("Diamond", "d01a849b92670e79adce", 750),
    ("Calendar", "d01a849b95b3da4d0acb", 1000),
];

//! Program ids and fixed keys this program trusts.

/// Wallet allowed to create the registry. Once the registry exists its
/// `admin` field is the authority for everything else.
pub mod admin {
    use anchor_lang::declare_id;

    declare_id!("E9rpsfTJQph6Ev4TeEgRubGBaPUbJuoD1VsEYbfqaFXZ");
}

pub mod drift {
    use anchor_lang::declare_id;

    #[cfg(not(feature = "localnet"))]
    declare_id!("dRiftyHA39MWEi3m9aunc5MzRF1JYuBsbn6VPcn33UH");

    // Drift build deployed by the local validator fixtures.
    #[cfg(feature = "localnet")]
    declare_id!("DftNc7gwihkEEwQRpu4bV89N18xpNEuBVg7YkhTZZhVo");
}

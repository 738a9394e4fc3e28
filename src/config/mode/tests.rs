use super::*;

#[test]
fn normal_mode_is_exhaustive_top_five() {
    let profile = PerformanceMode::Normal.profile();
    assert_eq!(profile.top_k, 5);
    assert_eq!(profile.strategy, SearchStrategy::Exhaustive);
    assert_eq!(profile.prompt_style, PromptStyle::Verbose);
    assert_eq!(profile.chunk_size, 500);
    assert_eq!(profile.chunk_overlap, 50);
}

#[test]
fn fast_modes_use_bounded_search() {
    let fast = PerformanceMode::Fast.profile();
    assert_eq!(fast.top_k, 3);
    assert_eq!(fast.strategy, SearchStrategy::Bounded);
    assert_eq!(fast.prompt_style, PromptStyle::Terse);

    let ultra = PerformanceMode::UltraFast.profile();
    assert_eq!(ultra.top_k, 2);
    assert_eq!(ultra.strategy, SearchStrategy::Bounded);
    assert_eq!(ultra.prompt_style, PromptStyle::Terse);
}

#[test]
fn timeouts_shrink_with_faster_modes() {
    let normal = PerformanceMode::Normal.profile();
    let fast = PerformanceMode::Fast.profile();
    let ultra = PerformanceMode::UltraFast.profile();

    assert!(normal.generation_timeout > fast.generation_timeout);
    assert!(fast.generation_timeout > ultra.generation_timeout);
    assert!(normal.embedding_timeout > fast.embedding_timeout);
    assert!(fast.embedding_timeout > ultra.embedding_timeout);
    assert!(ultra.generation_timeout <= Duration::from_secs(10));
}

#[test]
fn overlap_is_smaller_than_chunk_size() {
    for mode in PerformanceMode::ALL {
        let profile = mode.profile();
        assert!(profile.chunk_overlap < profile.chunk_size, "{}", mode);
    }
}

#[test]
fn parse_mode_names() {
    assert_eq!("normal".parse(), Ok(PerformanceMode::Normal));
    assert_eq!("FAST".parse(), Ok(PerformanceMode::Fast));
    assert_eq!("ultra-fast".parse(), Ok(PerformanceMode::UltraFast));
    assert_eq!("ultra_fast".parse(), Ok(PerformanceMode::UltraFast));
    assert!("turbo".parse::<PerformanceMode>().is_err());
}

#[test]
fn display_round_trips_through_parse() {
    for mode in PerformanceMode::ALL {
        assert_eq!(mode.to_string().parse(), Ok(mode));
    }
}

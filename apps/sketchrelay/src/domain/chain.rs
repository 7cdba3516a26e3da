//! Rebuild every player's prompt -> animation -> prompt chain for playback.
//!
//! Total over missing data: each chain always has `total_rounds` steps, a
//! missing prompt is `None` and a missing drawing is an empty frame list.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::domain::latest::latest_by_key;
use crate::domain::model::{Frame, FrameContent, Player, Prompt, Round};
use crate::domain::rotation::{chain_drawer, chain_prompt_author, ring};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainStep {
    pub round: i32,
    pub prompt: Option<String>,
    pub prompt_author_id: i64,
    pub prompt_author: String,
    pub animation_author_id: i64,
    pub animation_author: String,
    pub animation_frames: Vec<FrameContent>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chain {
    pub origin_player_id: i64,
    pub origin_nickname: String,
    pub steps: Vec<ChainStep>,
}

/// Everything recorded for one game.
#[derive(Debug, Clone, Copy)]
pub struct ChainInputs<'a> {
    pub players: &'a [Player],
    pub rounds: &'a [Round],
    pub prompts: &'a [Prompt],
    pub frames: &'a [Frame],
    pub total_rounds: i32,
}

pub fn reconstruct_chains(input: ChainInputs<'_>) -> Vec<Chain> {
    let ring = ring(input.players);
    let n = ring.len();

    let prompts = latest_by_key(input.prompts.iter().cloned(), |p| {
        (p.round_number, p.player_id)
    });
    let animations = current_animations(input.rounds, input.frames);

    ring.iter()
        .enumerate()
        .map(|(origin, origin_player)| {
            let steps = (1..=input.total_rounds.max(0))
                .filter_map(|round| {
                    let author = &ring[chain_prompt_author(origin, round, n)?];
                    let drawer = &ring[chain_drawer(origin, round, n)?];
                    Some(ChainStep {
                        round,
                        prompt: prompts.get(&(round, author.id)).map(|p| p.text.clone()),
                        prompt_author_id: author.id,
                        prompt_author: author.nickname.clone(),
                        animation_author_id: drawer.id,
                        animation_author: drawer.nickname.clone(),
                        animation_frames: animations
                            .get(&(round, drawer.id))
                            .cloned()
                            .unwrap_or_default(),
                    })
                })
                .collect();

            Chain {
                origin_player_id: origin_player.id,
                origin_nickname: origin_player.nickname.clone(),
                steps,
            }
        })
        .collect()
}

/// Latest content per (round_number, player), frames ordered by number.
///
/// Frames saved against any row of a round number count for that round, so a
/// duplicate round row never hides a drawing.
pub fn current_animations(
    rounds: &[Round],
    frames: &[Frame],
) -> HashMap<(i32, i64), Vec<FrameContent>> {
    let round_numbers: HashMap<i64, i32> = rounds.iter().map(|r| (r.id, r.round_number)).collect();

    let latest: BTreeMap<(i32, i64, i16), Frame> = latest_by_key(
        frames
            .iter()
            .filter(|f| round_numbers.contains_key(&f.round_id))
            .cloned(),
        |f| {
            (
                round_numbers.get(&f.round_id).copied().unwrap_or_default(),
                f.player_id,
                f.frame_number,
            )
        },
    );

    let mut out: HashMap<(i32, i64), Vec<FrameContent>> = HashMap::new();
    for ((round_number, player_id, frame_number), frame) in latest {
        out.entry((round_number, player_id))
            .or_default()
            .push(FrameContent {
                frame_number,
                image_data: frame.image_data,
            });
    }
    out
}

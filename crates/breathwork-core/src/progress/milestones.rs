//! Encouragement text and achievements derived from the counters.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Achievement {
    pub title: &'static str,
    pub description: &'static str,
}

pub fn streak_message(streak: u32) -> &'static str {
    match streak {
        0 => "Start your breathing journey today!",
        1 => "Great start! Keep it going!",
        2..=6 => "Building a healthy habit!",
        7..=29 => "You're on fire!",
        _ => "Breathing master!",
    }
}

/// Shown right after a session completes; `streak` already includes it.
pub fn completion_message(streak: u32) -> &'static str {
    match streak {
        0 | 1 => "Congratulations on your first session!",
        2..=6 => "Great job building your breathing habit!",
        7..=29 => "You're on an amazing streak! Keep it up!",
        _ => "You're a breathing master! Incredible dedication!",
    }
}

pub fn next_goal(streak: u32) -> &'static str {
    match streak {
        0..=6 => "Try to reach a 7-day streak!",
        7..=29 => "Can you make it to 30 days?",
        _ => "You've mastered consistency! Try a new technique!",
    }
}

pub fn achievements(total_sessions: u32, streak: u32) -> Vec<Achievement> {
    let mut earned = Vec::new();
    if total_sessions >= 1 {
        earned.push(Achievement {
            title: "First Breath",
            description: "Completed your first session",
        });
    }
    if total_sessions >= 10 {
        earned.push(Achievement {
            title: "Dedicated Breather",
            description: "Completed 10 sessions",
        });
    }
    if total_sessions >= 50 {
        earned.push(Achievement {
            title: "Breathing Expert",
            description: "Completed 50 sessions",
        });
    }
    if streak >= 7 {
        earned.push(Achievement {
            title: "Week Warrior",
            description: "7 day streak",
        });
    }
    if streak >= 30 {
        earned.push(Achievement {
            title: "Monthly Master",
            description: "30 day streak",
        });
    }
    earned
}

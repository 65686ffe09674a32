pub const ANALYSIS_PROMPT: &str = "Analyze these frames from a 10-second classroom video.
1. Count the exact number of unique people (students and teacher) visible across these frames.
2. Provide a brief description of the classroom setting and activity.
3. List key visual features detected (e.g., \"sitting at desks\", \"raising hands\", \"whiteboard visible\").

Be as accurate as possible with the head count.";

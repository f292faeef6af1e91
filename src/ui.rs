use crate::config::SetupStatus;
use crate::models::DashboardStats;

pub fn render_index(date: &str, stats: &DashboardStats, setup: &SetupStatus) -> String {
    let banner = if setup.complete {
        String::new()
    } else {
        let mut missing = Vec::new();
        if !setup.datastore {
            missing.push("datastore");
        }
        if !setup.patient {
            missing.push("patient profile");
        }
        if !setup.pain_scale {
            missing.push("pain scale");
        }
        format!(
            r#"<p class="banner">Setup incomplete: {} not configured yet.</p>"#,
            missing.join(", ")
        )
    };

    INDEX_HTML
        .replace("{{DATE}}", date)
        .replace("{{SETUP_BANNER}}", &banner)
        .replace("{{TOTAL}}", &stats.total_entries.to_string())
        .replace("{{THIS_MONTH}}", &stats.this_month.to_string())
        .replace("{{MIGRAINES}}", &stats.migraine_count.to_string())
        .replace("{{CLUSTERS}}", &stats.cluster_count.to_string())
        .replace("{{AVG_PAIN}}", &format!("{:.1}", stats.average_pain_level))
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Headache Tracker</title>
  <style>
    :root {
      --bg: #f3f1f7;
      --ink: #26233a;
      --muted: #6e6a86;
      --migraine: #7c5cff;
      --cluster: #e0565b;
      --card: #ffffff;
      --shadow: 0 18px 40px rgba(38, 35, 58, 0.12);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      background: var(--bg);
      color: var(--ink);
      font-family: "Segoe UI", "Helvetica Neue", sans-serif;
      padding: 28px 16px 48px;
    }

    .app {
      width: min(980px, 100%);
      margin: 0 auto;
      display: grid;
      gap: 24px;
    }

    h1 {
      margin: 0;
      font-size: clamp(1.8rem, 4vw, 2.4rem);
    }

    h2 {
      margin: 0 0 12px;
      font-size: 1.2rem;
    }

    .subtitle {
      margin: 4px 0 0;
      color: var(--muted);
    }

    .banner {
      margin: 0;
      padding: 12px 16px;
      border-radius: 12px;
      background: #fff4d6;
      color: #7a5b00;
    }

    .card {
      background: var(--card);
      border-radius: 18px;
      box-shadow: var(--shadow);
      padding: 20px;
    }

    .panel {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(150px, 1fr));
      gap: 14px;
    }

    .stat .label {
      display: block;
      font-size: 0.8rem;
      text-transform: uppercase;
      letter-spacing: 0.1em;
      color: var(--muted);
    }

    .stat .value {
      display: block;
      font-size: 1.6rem;
      font-weight: 600;
    }

    form.log {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(180px, 1fr));
      gap: 12px;
      align-items: end;
    }

    label {
      display: grid;
      gap: 4px;
      font-size: 0.9rem;
      color: var(--muted);
    }

    input, select, textarea {
      font: inherit;
      padding: 8px 10px;
      border-radius: 10px;
      border: 1px solid #d7d3e6;
    }

    button {
      font: inherit;
      font-weight: 600;
      border: none;
      border-radius: 999px;
      padding: 10px 18px;
      background: var(--migraine);
      color: white;
      cursor: pointer;
    }

    button.secondary {
      background: #ece9f6;
      color: var(--ink);
    }

    table {
      width: 100%;
      border-collapse: collapse;
    }

    th, td {
      text-align: left;
      padding: 8px 6px;
      border-bottom: 1px solid #eeebf5;
      font-size: 0.95rem;
    }

    .pill {
      padding: 2px 10px;
      border-radius: 999px;
      color: white;
      font-size: 0.8rem;
    }

    .pill.migraine {
      background: var(--migraine);
    }

    .pill.cluster {
      background: var(--cluster);
    }

    .charts {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(300px, 1fr));
      gap: 18px;
    }

    svg {
      width: 100%;
      height: 220px;
      display: block;
    }

    .chart-label {
      fill: var(--muted);
      font-size: 11px;
    }

    .status {
      min-height: 1.2em;
      color: var(--muted);
    }

    .status[data-type="error"] {
      color: #c63b2b;
    }
  </style>
</head>
<body>
  <main class="app">
    <header>
      <h1>Headache Tracker</h1>
      <p class="subtitle">Today is {{DATE}}.</p>
    </header>

    {{SETUP_BANNER}}

    <section class="panel">
      <div class="card stat"><span class="label">Episodes</span><span class="value" id="total">{{TOTAL}}</span></div>
      <div class="card stat"><span class="label">This month</span><span class="value" id="this-month">{{THIS_MONTH}}</span></div>
      <div class="card stat"><span class="label">Migraines</span><span class="value" id="migraines">{{MIGRAINES}}</span></div>
      <div class="card stat"><span class="label">Clusters</span><span class="value" id="clusters">{{CLUSTERS}}</span></div>
      <div class="card stat"><span class="label">Average pain</span><span class="value" id="avg-pain">{{AVG_PAIN}}</span></div>
    </section>

    <section class="card">
      <h2>Log a headache</h2>
      <form class="log" id="log-form">
        <label>Type
          <select name="type">
            <option value="migraine">Migraine</option>
            <option value="cluster">Cluster</option>
          </select>
        </label>
        <label>Date <input type="date" name="date" value="{{DATE}}" required /></label>
        <label>Start <input type="time" name="startTime" required /></label>
        <label>End <input type="time" name="endTime" /></label>
        <label>Pain (1-10) <input type="number" name="painLevel" min="1" max="10" value="5" required /></label>
        <label>Triggers <select name="triggers" id="triggers" multiple></select></label>
        <label>Symptoms <select name="symptoms" id="symptoms" multiple></select></label>
        <label>Notes <textarea name="notes" rows="2"></textarea></label>
        <button type="submit">Save</button>
      </form>
      <div class="status" id="status"></div>
    </section>

    <section class="charts">
      <div class="card">
        <h2>Monthly trend</h2>
        <svg id="trend-chart" viewBox="0 0 420 220" role="img" aria-label="Monthly trend"></svg>
      </div>
      <div class="card">
        <h2>Pain levels</h2>
        <svg id="pain-chart" viewBox="0 0 420 220" role="img" aria-label="Pain level distribution"></svg>
      </div>
    </section>

    <section class="card">
      <h2>Recent episodes</h2>
      <table>
        <thead>
          <tr><th>Date</th><th>Type</th><th>Start</th><th>Duration</th><th>Pain</th><th></th></tr>
        </thead>
        <tbody id="entries"></tbody>
      </table>
    </section>
  </main>

  <script>
    const statusEl = document.getElementById('status');
    const form = document.getElementById('log-form');

    const setStatus = (message, type) => {
      statusEl.textContent = message;
      statusEl.dataset.type = type || '';
    };

    const escapeHtml = (value) => String(value ?? '')
      .replace(/&/g, '&amp;')
      .replace(/</g, '&lt;')
      .replace(/>/g, '&gt;')
      .replace(/"/g, '&quot;')
      .replace(/'/g, '&#39;');

    const formatDuration = (minutes) => {
      if (typeof minutes !== 'number') {
        return 'Not available';
      }
      const h = Math.floor(minutes / 60);
      const m = minutes % 60;
      if (h === 0) return `${m}m`;
      if (m === 0) return `${h}h`;
      return `${h}h ${m}m`;
    };

    const renderBars = (svg, bars) => {
      if (!bars.length) {
        svg.innerHTML = '<text class="chart-label" x="50%" y="50%" text-anchor="middle">No data yet</text>';
        return;
      }
      const width = 420;
      const height = 220;
      const bottom = 28;
      const max = Math.max(1, ...bars.map((bar) => bar.segments.reduce((sum, s) => sum + s.value, 0)));
      const slot = width / bars.length;
      const barWidth = Math.max(6, slot * 0.6);
      let out = '';
      bars.forEach((bar, index) => {
        let y = height - bottom;
        const x = index * slot + (slot - barWidth) / 2;
        bar.segments.forEach((segment) => {
          const h = (segment.value / max) * (height - bottom - 12);
          y -= h;
          out += `<rect x="${x}" y="${y}" width="${barWidth}" height="${h}" fill="${segment.color}" rx="3" />`;
        });
        out += `<text class="chart-label" x="${x + barWidth / 2}" y="${height - 10}" text-anchor="middle">${escapeHtml(bar.label)}</text>`;
      });
      svg.innerHTML = out;
    };

    const loadStats = async () => {
      const res = await fetch('/api/stats');
      if (!res.ok) throw new Error('Unable to load stats');
      const stats = await res.json();
      document.getElementById('total').textContent = stats.totalEntries;
      document.getElementById('this-month').textContent = stats.thisMonth;
      document.getElementById('migraines').textContent = stats.migraineCount;
      document.getElementById('clusters').textContent = stats.clusterCount;
      document.getElementById('avg-pain').textContent = stats.averagePainLevel.toFixed(1);
      renderBars(document.getElementById('trend-chart'), stats.monthlyTrends.map((month) => ({
        label: month.month.slice(0, 3),
        segments: [
          { value: month.migraines, color: 'var(--migraine)' },
          { value: month.clusters, color: 'var(--cluster)' }
        ]
      })));
      renderBars(document.getElementById('pain-chart'), stats.painLevelDistribution.map((bucket) => ({
        label: bucket.level,
        segments: [{ value: bucket.count, color: 'var(--migraine)' }]
      })));
    };

    const loadEntries = async () => {
      const res = await fetch('/api/headaches');
      if (!res.ok) throw new Error('Unable to load headaches');
      const entries = await res.json();
      document.getElementById('entries').innerHTML = entries.slice(0, 20).map((entry) => `
        <tr>
          <td>${escapeHtml(entry.date)}</td>
          <td><span class="pill ${escapeHtml(entry.type)}">${escapeHtml(entry.type)}</span></td>
          <td>${escapeHtml(entry.startTime)}</td>
          <td>${formatDuration(entry.duration)}</td>
          <td>${escapeHtml(entry.painLevel)}</td>
          <td>
            <form method="post" action="/headaches/delete">
              <input type="hidden" name="headacheId" value="${escapeHtml(entry.id)}" />
              <button class="secondary" type="submit">Delete</button>
            </form>
          </td>
        </tr>`).join('');
    };

    const loadOptions = async () => {
      const res = await fetch('/api/options');
      if (!res.ok) throw new Error('Unable to load options');
      const options = await res.json();
      for (const key of ['triggers', 'symptoms']) {
        document.getElementById(key).innerHTML = options[key]
          .map((option) => `<option value="${escapeHtml(option.id)}">${escapeHtml(option.name)}</option>`)
          .join('');
      }
    };

    const selected = (name) => Array.from(form.elements[name].selectedOptions).map((option) => option.value);

    form.addEventListener('submit', async (event) => {
      event.preventDefault();
      setStatus('Saving...', 'info');
      const data = new FormData(form);
      const body = {
        type: data.get('type'),
        date: data.get('date'),
        startTime: data.get('startTime'),
        endTime: data.get('endTime') || null,
        painLevel: Number(data.get('painLevel')),
        triggers: selected('triggers'),
        symptoms: selected('symptoms'),
        notes: data.get('notes') || null
      };
      try {
        const res = await fetch('/api/headaches', {
          method: 'POST',
          headers: { 'content-type': 'application/json' },
          body: JSON.stringify(body)
        });
        if (!res.ok) {
          const err = await res.json().catch(() => ({}));
          throw new Error(err.error || 'Request failed');
        }
        setStatus('Saved', 'ok');
        form.reset();
        await Promise.all([loadStats(), loadEntries()]);
      } catch (err) {
        setStatus(err.message, 'error');
      }
    });

    Promise.all([loadOptions(), loadStats(), loadEntries()])
      .catch((err) => setStatus(err.message, 'error'));
  </script>
</body>
</html>
"#;
